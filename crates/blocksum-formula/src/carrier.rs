//! Context-independent formula carrier.
//!
//! Each worker owns its own solver session and symbol table, so a
//! condition computed on one worker cannot be handed to another as-is.
//! [`DetachedCondition`] is the detached, serializable form of a
//! [`PathCondition`]; [`DetachedCondition::attach`] rebuilds it against
//! a target worker's [`FormulaContext`], registering every symbol the
//! formula refers to. Attaching never mutates the producing side and is
//! idempotent on the target.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::condition::{MemoryFootprint, PathCondition};
use crate::ssa::{SmtType, SsaMap};

/// Errors raised while rebuilding a formula in a new context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// A symbol is already registered at a different sort.
    #[error("sort clash for `{name}`: declared {declared}, requested {requested}")]
    SortClash {
        name: String,
        declared: String,
        requested: String,
    },
}

/// A path condition detached from the solver context that produced it.
///
/// Safe to clone across threads and to ship through scheduler channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedCondition {
    formula: String,
    ssa: SsaMap,
    footprint: MemoryFootprint,
}

impl DetachedCondition {
    /// Detach a condition from its producing context.
    pub fn detach(condition: &PathCondition) -> Self {
        Self {
            formula: condition.formula().to_string(),
            ssa: condition.ssa().clone(),
            footprint: condition.footprint().clone(),
        }
    }

    /// The detached form of the trivial condition `true`.
    pub fn trivial() -> Self {
        Self::detach(&PathCondition::trivial())
    }

    pub fn is_trivial(&self) -> bool {
        self.formula == "true"
    }

    /// SMT-LIB2 formula body, for reporting.
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Rebuild the condition against `context`, registering every
    /// symbol it refers to. Fails only when a symbol is already known
    /// to the context at a different sort.
    pub fn attach(&self, context: &mut FormulaContext) -> Result<PathCondition, FormulaError> {
        for (name, entry) in self.ssa.iter() {
            context.register(name, &entry.ty, entry.version)?;
        }
        Ok(PathCondition::new(
            self.formula.clone(),
            self.ssa.clone(),
            self.footprint.clone(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContextSymbol {
    ty: SmtType,
    max_version: u32,
}

/// Per-worker symbol table.
///
/// Tracks, for every variable name seen by this worker, its sort and
/// the highest incarnation registered so far. One context exists per
/// task; nothing in it is shared.
#[derive(Debug, Clone, Default)]
pub struct FormulaContext {
    symbols: BTreeMap<String, ContextSymbol>,
}

impl FormulaContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` at `version` with sort `ty`, extending the known
    /// version range. Rejects sort clashes.
    pub fn register(&mut self, name: &str, ty: &SmtType, version: u32) -> Result<(), FormulaError> {
        match self.symbols.get_mut(name) {
            Some(symbol) => {
                if symbol.ty != *ty {
                    return Err(FormulaError::SortClash {
                        name: name.to_string(),
                        declared: symbol.ty.to_smt_string(),
                        requested: ty.to_smt_string(),
                    });
                }
                symbol.max_version = symbol.max_version.max(version);
            }
            None => {
                self.symbols.insert(
                    name.to_string(),
                    ContextSymbol {
                        ty: ty.clone(),
                        max_version: version,
                    },
                );
            }
        }
        Ok(())
    }

    /// Highest registered incarnation of `name`, if any.
    pub fn max_version(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).map(|s| s.max_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssa::SsaMap;

    fn sample() -> DetachedCondition {
        let mut ssa = SsaMap::new();
        ssa.insert("x", SmtType::Int, 2);
        ssa.insert("flag", SmtType::Bool, 1);
        DetachedCondition::detach(&PathCondition::new(
            "(and flag_1 (= x_2 (+ x_1 1)))",
            ssa,
            MemoryFootprint::new(),
        ))
    }

    #[test]
    fn test_attach_registers_symbols() {
        let carried = sample();
        let mut ctx = FormulaContext::new();
        let attached = carried.attach(&mut ctx).unwrap();
        assert_eq!(attached.formula(), "(and flag_1 (= x_2 (+ x_1 1)))");
        assert_eq!(ctx.max_version("x"), Some(2));
        assert_eq!(ctx.max_version("flag"), Some(1));
    }

    #[test]
    fn test_attach_is_idempotent() {
        let carried = sample();
        let mut ctx = FormulaContext::new();
        let first = carried.attach(&mut ctx).unwrap();
        let second = carried.attach(&mut ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.max_version("x"), Some(2));
    }

    #[test]
    fn test_attach_rejects_sort_clash() {
        let carried = sample();
        let mut ctx = FormulaContext::new();
        ctx.register("x", &SmtType::Bool, 1).unwrap();
        let err = carried.attach(&mut ctx).unwrap_err();
        assert!(matches!(err, FormulaError::SortClash { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_register_extends_version_range() {
        let mut ctx = FormulaContext::new();
        ctx.register("x", &SmtType::Int, 3).unwrap();
        ctx.register("x", &SmtType::Int, 1).unwrap();
        assert_eq!(ctx.max_version("x"), Some(3));
    }

    #[test]
    fn test_detached_condition_survives_serialization() {
        let carried = sample();
        let json = serde_json::to_string(&carried).unwrap();
        let restored: DetachedCondition = serde_json::from_str(&json).unwrap();
        assert_eq!(carried, restored);
    }
}
