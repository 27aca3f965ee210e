//! SSA version maps for symbolic path conditions.
//!
//! Every program variable in a path formula is a numbered incarnation:
//! `x` at version 3 occurs in the SMT-LIB2 text as the symbol `x_3`.
//! The [`SsaMap`] records, per variable, the highest incarnation a
//! formula currently refers to together with its SMT sort. Two formulas
//! built with independent version counters must never be conjoined
//! directly; see the `stitch` module.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// SMT-LIB2 sorts for versioned variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmtType {
    Bool,
    Int,
    BitVec(u32),
}

impl SmtType {
    /// Convert to SMT-LIB2 sort string.
    pub fn to_smt_string(&self) -> String {
        match self {
            SmtType::Bool => "Bool".to_string(),
            SmtType::Int => "Int".to_string(),
            SmtType::BitVec(width) => format!("(_ BitVec {width})"),
        }
    }
}

/// Per-variable record: current version and sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsaEntry {
    /// Highest incarnation referred to by the owning formula.
    pub version: u32,
    /// SMT sort shared by all incarnations of the variable.
    pub ty: SmtType,
    /// Cached pattern matching versioned occurrences (not serialized).
    #[serde(skip, default = "SsaEntry::empty_regex_cell")]
    occurrences: OnceCell<Regex>,
}

impl SsaEntry {
    pub fn new(version: u32, ty: SmtType) -> Self {
        Self {
            version,
            ty,
            occurrences: OnceCell::new(),
        }
    }

    fn empty_regex_cell() -> OnceCell<Regex> {
        OnceCell::new()
    }
}

impl PartialEq for SsaEntry {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.ty == other.ty
    }
}

impl Eq for SsaEntry {}

/// Render a variable incarnation as its SMT symbol, e.g. `x_3`.
pub fn versioned_symbol(name: &str, version: u32) -> String {
    format!("{name}_{version}")
}

/// Map from variable name to its current version and sort.
///
/// Iteration order is the variable-name order, so declaration preambles
/// and renaming passes are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SsaMap {
    entries: BTreeMap<String, SsaEntry>,
}

impl SsaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` at `version` with sort `ty`, replacing any previous
    /// entry for the same name.
    pub fn insert(&mut self, name: impl Into<String>, ty: SmtType, version: u32) {
        self.entries.insert(name.into(), SsaEntry::new(version, ty));
    }

    /// Current version of `name`, if tracked.
    pub fn version_of(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(|e| e.version)
    }

    /// Sort of `name`, if tracked.
    pub fn ty_of(&self, name: &str) -> Option<&SmtType> {
        self.entries.get(name).map(|e| &e.ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SsaEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SMT-LIB2 `declare-const` preamble covering every incarnation of
    /// every tracked variable, versions 1 through the current one.
    pub fn declarations(&self) -> String {
        let mut decls = String::new();
        for (name, entry) in &self.entries {
            let sort = entry.ty.to_smt_string();
            for version in 1..=entry.version {
                let _ = writeln!(
                    decls,
                    "(declare-const {} {sort})",
                    versioned_symbol(name, version)
                );
            }
        }
        decls
    }

    /// Pattern matching every versioned occurrence of `name`, i.e. the
    /// symbols `name_1`, `name_2`, ... including uninterpreted-function
    /// applications of them. Cached per entry.
    pub(crate) fn occurrences(&self, name: &str) -> Option<&Regex> {
        self.entries.get(name).map(|entry| {
            entry.occurrences.get_or_init(|| {
                Regex::new(&format!(r"\b{}_([0-9]+)\b", regex::escape(name)))
                    .expect("valid regex")
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_symbol_format() {
        assert_eq!(versioned_symbol("x", 3), "x_3");
        assert_eq!(versioned_symbol("counter", 1), "counter_1");
    }

    #[test]
    fn test_smt_type_strings() {
        assert_eq!(SmtType::Bool.to_smt_string(), "Bool");
        assert_eq!(SmtType::Int.to_smt_string(), "Int");
        assert_eq!(SmtType::BitVec(32).to_smt_string(), "(_ BitVec 32)");
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut map = SsaMap::new();
        map.insert("x", SmtType::Int, 4);
        assert_eq!(map.version_of("x"), Some(4));
        assert_eq!(map.ty_of("x"), Some(&SmtType::Int));
        assert_eq!(map.version_of("y"), None);
        assert!(map.contains("x"));
        assert!(!map.contains("y"));
    }

    #[test]
    fn test_declarations_cover_all_versions() {
        let mut map = SsaMap::new();
        map.insert("x", SmtType::Int, 2);
        map.insert("b", SmtType::Bool, 1);
        let decls = map.declarations();
        assert!(decls.contains("(declare-const b_1 Bool)"));
        assert!(decls.contains("(declare-const x_1 Int)"));
        assert!(decls.contains("(declare-const x_2 Int)"));
        assert!(!decls.contains("x_3"));
    }

    #[test]
    fn test_occurrence_pattern_matches_versions_only() {
        let mut map = SsaMap::new();
        map.insert("x", SmtType::Int, 2);
        let re = map.occurrences("x").unwrap();
        assert!(re.is_match("(= x_1 (+ x_2 1))"));
        // `max_1` must not match the pattern for `x`.
        assert!(!re.is_match("(= max_1 0)"));
        assert!(map.occurrences("missing").is_none());
    }

    #[test]
    fn test_entry_equality_ignores_cache() {
        let a = SsaEntry::new(2, SmtType::Int);
        let b = SsaEntry::new(2, SmtType::Int);
        let re = Regex::new(r"\bx_([0-9]+)\b").unwrap();
        let _ = a.occurrences.set(re);
        assert_eq!(a, b);
    }
}
