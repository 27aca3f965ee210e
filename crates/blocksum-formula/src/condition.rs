//! Symbolic path conditions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ssa::SsaMap;

/// Opaque pointer/memory-region footprint of a path condition.
///
/// The engine never interprets region labels; it only carries them
/// alongside the formula so that downstream consumers can reason about
/// aliasing. Footprints of stitched conditions are *not* merged (see
/// [`crate::stitch::stitch`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryFootprint {
    regions: BTreeSet<String>,
}

impl MemoryFootprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: impl Into<String>) {
        self.regions.insert(region.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.regions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl FromIterator<String> for MemoryFootprint {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            regions: iter.into_iter().collect(),
        }
    }
}

/// A boolean formula over versioned variables, together with its SSA
/// map and memory footprint.
///
/// Path conditions are immutable values. Two conditions produced with
/// independent version counters are combined only through the stitching
/// algorithm, never by naive conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCondition {
    formula: String,
    ssa: SsaMap,
    footprint: MemoryFootprint,
}

impl PathCondition {
    /// Build a condition from an SMT-LIB2 formula body and its maps.
    pub fn new(formula: impl Into<String>, ssa: SsaMap, footprint: MemoryFootprint) -> Self {
        Self {
            formula: formula.into(),
            ssa,
            footprint,
        }
    }

    /// The trivial condition `true`: no constraint known.
    pub fn trivial() -> Self {
        Self::new("true", SsaMap::new(), MemoryFootprint::new())
    }

    /// The contradictory condition `false`.
    pub fn contradiction() -> Self {
        Self::new("false", SsaMap::new(), MemoryFootprint::new())
    }

    pub fn is_trivial(&self) -> bool {
        self.formula == "true"
    }

    /// SMT-LIB2 formula body.
    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn ssa(&self) -> &SsaMap {
        &self.ssa
    }

    pub fn footprint(&self) -> &MemoryFootprint {
        &self.footprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssa::SmtType;

    #[test]
    fn test_trivial_condition() {
        let cond = PathCondition::trivial();
        assert!(cond.is_trivial());
        assert_eq!(cond.formula(), "true");
        assert!(cond.ssa().is_empty());
        assert!(cond.footprint().is_empty());
    }

    #[test]
    fn test_contradiction_is_not_trivial() {
        assert!(!PathCondition::contradiction().is_trivial());
    }

    #[test]
    fn test_condition_accessors() {
        let mut ssa = SsaMap::new();
        ssa.insert("x", SmtType::Int, 1);
        let footprint: MemoryFootprint = ["heap::a".to_string()].into_iter().collect();
        let cond = PathCondition::new("(= x_1 1)", ssa, footprint);
        assert_eq!(cond.formula(), "(= x_1 1)");
        assert_eq!(cond.ssa().version_of("x"), Some(1));
        assert!(!cond.footprint().is_empty());
    }
}
