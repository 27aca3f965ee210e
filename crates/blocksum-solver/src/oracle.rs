//! The solver oracle boundary.
//!
//! The engine treats satisfiability as an opaque, potentially-blocking
//! question. Every query is self-contained: a declaration preamble plus
//! a single assertion, so any worker can hand it to any solver session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;

use blocksum_formula::{PathCondition, SmtType};

/// Errors raised by a solver backend.
#[derive(Debug, Error)]
pub enum SolverError {
    /// No solver binary could be located.
    #[error("no solver binary available")]
    Unavailable,

    /// The query did not finish within the configured budget.
    #[error("solver timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The solver gave up without a verdict.
    #[error("solver returned unknown: {reason}")]
    Unknown { reason: String },

    /// The solver produced output we could not classify.
    #[error("unexpected solver output: {output}")]
    UnexpectedOutput { output: String },

    /// Process-level failure.
    #[error("solver i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a task does when a solver query fails.
///
/// A failed satisfiability check is *not* an unsatisfiability proof.
/// The historical behavior of this engine equated the two, which is
/// unsound; it survives only behind the explicit compatibility value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverFailurePolicy {
    /// Surface the failure; the task errors out and the run reports it.
    #[default]
    Surface,

    /// Log the failure and treat the condition as unreachable.
    /// Compatibility behavior: this can mask real violations.
    AssumeUnreachable,
}

/// A self-contained satisfiability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverQuery {
    declarations: String,
    assertion: String,
}

impl SolverQuery {
    /// Query whether `condition` is satisfiable.
    pub fn satisfiability(condition: &PathCondition) -> Self {
        Self {
            declarations: condition.ssa().declarations(),
            assertion: condition.formula().to_string(),
        }
    }

    /// Query whether `antecedent` implies `consequent`, posed as
    /// unsatisfiability of `antecedent ∧ ¬consequent`.
    pub fn implication(antecedent: &PathCondition, consequent: &PathCondition) -> Self {
        Self {
            declarations: merged_declarations(antecedent, consequent),
            assertion: format!(
                "(and {} (not {}))",
                antecedent.formula(),
                consequent.formula()
            ),
        }
    }

    /// Render the full SMT-LIB2 script.
    pub fn to_smt2(&self) -> String {
        format!(
            "(set-logic ALL)\n{}(assert {})\n(check-sat)\n",
            self.declarations, self.assertion
        )
    }
}

/// Declaration preamble covering both conditions, deduplicated by
/// taking the higher incarnation count per variable.
fn merged_declarations(a: &PathCondition, b: &PathCondition) -> String {
    let mut decls = String::new();
    let mut emit = |name: &str, ty: &SmtType, upto: u32| {
        let sort = ty.to_smt_string();
        for version in 1..=upto {
            let _ = writeln!(decls, "(declare-const {name}_{version} {sort})");
        }
    };
    for (name, entry) in a.ssa().iter() {
        let upto = entry
            .version
            .max(b.ssa().version_of(name).unwrap_or(0));
        emit(name, &entry.ty, upto);
    }
    for (name, entry) in b.ssa().iter() {
        if !a.ssa().contains(name) {
            emit(name, &entry.ty, entry.version);
        }
    }
    decls
}

/// An SMT solver treated as an opaque oracle.
///
/// Implementations must be shareable across workers; queries may block
/// for extended periods.
#[async_trait]
pub trait SolverOracle: Send + Sync {
    /// Is the queried assertion unsatisfiable?
    async fn is_unsat(&self, query: &SolverQuery) -> Result<bool, SolverError>;

    /// Does `antecedent` imply `consequent`?
    async fn implies(
        &self,
        antecedent: &PathCondition,
        consequent: &PathCondition,
    ) -> Result<bool, SolverError> {
        let query = SolverQuery::implication(antecedent, consequent);
        self.is_unsat(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksum_formula::{MemoryFootprint, SsaMap};

    fn condition(formula: &str, vars: &[(&str, u32)]) -> PathCondition {
        let mut ssa = SsaMap::new();
        for (name, version) in vars {
            ssa.insert(*name, SmtType::Int, *version);
        }
        PathCondition::new(formula, ssa, MemoryFootprint::new())
    }

    #[test]
    fn test_satisfiability_query_script() {
        let cond = condition("(= x_2 (+ x_1 1))", &[("x", 2)]);
        let script = SolverQuery::satisfiability(&cond).to_smt2();
        assert!(script.starts_with("(set-logic ALL)\n"));
        assert!(script.contains("(declare-const x_1 Int)"));
        assert!(script.contains("(declare-const x_2 Int)"));
        assert!(script.contains("(assert (= x_2 (+ x_1 1)))"));
        assert!(script.trim_end().ends_with("(check-sat)"));
    }

    #[test]
    fn test_implication_query_negates_consequent() {
        let a = condition("(= x_1 1)", &[("x", 1)]);
        let b = condition("(> x_1 0)", &[("x", 1)]);
        let query = SolverQuery::implication(&a, &b);
        let script = query.to_smt2();
        assert!(script.contains("(assert (and (= x_1 1) (not (> x_1 0))))"));
        // Shared variable declared once.
        assert_eq!(script.matches("(declare-const x_1 Int)").count(), 1);
    }

    #[test]
    fn test_implication_declarations_cover_both_sides() {
        let a = condition("(= x_1 1)", &[("x", 1)]);
        let b = condition("(= y_2 x_1)", &[("x", 1), ("y", 2)]);
        let script = SolverQuery::implication(&a, &b).to_smt2();
        assert!(script.contains("(declare-const y_1 Int)"));
        assert!(script.contains("(declare-const y_2 Int)"));
    }

    #[test]
    fn test_failure_policy_default_is_surface() {
        assert_eq!(SolverFailurePolicy::default(), SolverFailurePolicy::Surface);
    }

    struct RecordingOracle {
        seen: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SolverOracle for RecordingOracle {
        async fn is_unsat(&self, query: &SolverQuery) -> Result<bool, SolverError> {
            self.seen.lock().unwrap().push(query.to_smt2());
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_implies_routes_through_is_unsat() {
        let oracle = RecordingOracle {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let a = condition("(= x_1 1)", &[("x", 1)]);
        let b = condition("(> x_1 0)", &[("x", 1)]);
        assert!(oracle.implies(&a, &b).await.unwrap());
        let seen = oracle.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("(not (> x_1 0))"));
    }
}
