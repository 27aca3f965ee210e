//! Verdicts, task outcomes, and run results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use blocksum_formula::DetachedCondition;

use crate::block::{BlockId, Location};

/// Soundness/precision status of an analysis-algorithm invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmStatus {
    /// The computed result over-approximates reachable behavior.
    pub sound: bool,
    /// The computed result introduced no imprecision.
    pub precise: bool,
}

impl AlgorithmStatus {
    pub fn sound_and_precise() -> Self {
        Self {
            sound: true,
            precise: true,
        }
    }

    /// Conjunction of two statuses: a run is only as good as its worst
    /// task.
    pub fn combine(self, other: Self) -> Self {
        Self {
            sound: self.sound && other.sound,
            precise: self.precise && other.precise,
        }
    }

    pub fn is_sound_and_precise(&self) -> bool {
        self.sound && self.precise
    }
}

impl Default for AlgorithmStatus {
    fn default() -> Self {
        Self::sound_and_precise()
    }
}

/// Outcome of checking an extracted condition at a predecessor-less
/// block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeVerdict {
    /// No violation is reachable along this path.
    Unsatisfiable,
    /// The condition is satisfiable: a violation is reachable.
    Satisfiable,
}

impl fmt::Display for EdgeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeVerdict::Unsatisfiable => write!(f, "condition unsatisfiable"),
            EdgeVerdict::Satisfiable => write!(f, "condition satisfiable"),
        }
    }
}

/// A concrete violation: a satisfiable error condition at the
/// program-entry side of the block graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// The predecessor-less block where the condition was checked.
    pub block: BlockId,
    /// Its entry location.
    pub entry: Location,
    /// The satisfiable condition.
    pub condition: DetachedCondition,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "violation reachable through {} at {}: {}",
            self.block,
            self.entry,
            self.condition.formula()
        )
    }
}

/// What a single block-analysis task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The incoming condition was unsatisfiable against the block's
    /// local summary; exploration never started.
    Swallowed,
    /// The block reached a per-invocation fixed point.
    Finished {
        /// Propagation requests emitted toward predecessors.
        propagated: usize,
        /// Solver verdicts collected at a predecessor-less block.
        verdicts: Vec<EdgeVerdict>,
    },
    /// Work remains; a continuation request was emitted.
    Suspended { propagated: usize },
    /// A concrete violation was found.
    ViolationFound(Violation),
}

/// Completion record of one task, routed back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    pub status: AlgorithmStatus,
    pub outcome: TaskOutcome,
}

/// Counters collected over one verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Seed requests issued for the error-side frontier.
    pub seeds_issued: usize,
    /// Tasks admitted by finalization and executed.
    pub tasks_executed: usize,
    /// Requests dropped by finalization.
    pub requests_invalidated: usize,
    /// Summary-table installs performed by finalization.
    pub summaries_installed: usize,
    /// Continuation requests routed through the scheduler.
    pub continuations: usize,
    /// Solver verdicts collected at predecessor-less blocks.
    pub edge_verdicts: usize,
    /// Wall-clock time for the run.
    pub elapsed: Duration,
}

/// Final result of a verification run.
#[derive(Debug, Clone)]
pub enum RunResult {
    /// No violation is reachable; `status` qualifies the guarantee.
    Safe {
        status: AlgorithmStatus,
        stats: RunStats,
    },
    /// A concrete violation was found.
    Unsafe {
        violation: Violation,
        stats: RunStats,
    },
    /// The run was cancelled cooperatively before completion.
    Interrupted { stats: RunStats },
    /// A task failed; the run was aborted.
    Failed { message: String, stats: RunStats },
}

impl RunResult {
    pub fn is_safe(&self) -> bool {
        matches!(self, RunResult::Safe { .. })
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, RunResult::Unsafe { .. })
    }

    pub fn stats(&self) -> &RunStats {
        match self {
            RunResult::Safe { stats, .. }
            | RunResult::Unsafe { stats, .. }
            | RunResult::Interrupted { stats }
            | RunResult::Failed { stats, .. } => stats,
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunResult::Safe { status, stats } => {
                writeln!(f, "RESULT: SAFE")?;
                if status.is_sound_and_precise() {
                    writeln!(f, "Sound and precise.")?;
                } else {
                    writeln!(
                        f,
                        "Qualified: sound={}, precise={}.",
                        status.sound, status.precise
                    )?;
                }
                write!(
                    f,
                    "{} tasks, {} summaries exchanged.",
                    stats.tasks_executed, stats.summaries_installed
                )
            }
            RunResult::Unsafe { violation, stats } => {
                writeln!(f, "RESULT: UNSAFE")?;
                writeln!(f, "{violation}")?;
                write!(f, "{} tasks executed.", stats.tasks_executed)
            }
            RunResult::Interrupted { stats } => {
                writeln!(f, "RESULT: INTERRUPTED")?;
                write!(f, "{} tasks executed before shutdown.", stats.tasks_executed)
            }
            RunResult::Failed { message, stats } => {
                writeln!(f, "RESULT: FAILED")?;
                writeln!(f, "Reason: {message}")?;
                write!(f, "{} tasks executed.", stats.tasks_executed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_combine_is_conjunction() {
        let good = AlgorithmStatus::sound_and_precise();
        let imprecise = AlgorithmStatus {
            sound: true,
            precise: false,
        };
        let combined = good.combine(imprecise);
        assert!(combined.sound);
        assert!(!combined.precise);
        assert!(!combined.is_sound_and_precise());
    }

    #[test]
    fn test_edge_verdict_display() {
        assert_eq!(
            EdgeVerdict::Unsatisfiable.to_string(),
            "condition unsatisfiable"
        );
        assert_eq!(
            EdgeVerdict::Satisfiable.to_string(),
            "condition satisfiable"
        );
    }

    #[test]
    fn test_run_result_predicates() {
        let safe = RunResult::Safe {
            status: AlgorithmStatus::sound_and_precise(),
            stats: RunStats::default(),
        };
        assert!(safe.is_safe());
        assert!(!safe.is_unsafe());
        let interrupted = RunResult::Interrupted {
            stats: RunStats::default(),
        };
        assert!(!interrupted.is_safe());
    }

    #[test]
    fn test_safe_display_mentions_result_line() {
        let result = RunResult::Safe {
            status: AlgorithmStatus::sound_and_precise(),
            stats: RunStats::default(),
        };
        let rendered = result.to_string();
        assert!(rendered.starts_with("RESULT: SAFE"));
        assert!(rendered.contains("Sound and precise."));
    }
}
