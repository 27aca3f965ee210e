//! Engine error taxonomy.
//!
//! Stale requests are *not* errors; finalization reports them through
//! the [`crate::request::Finalization`] enum. Everything here either
//! unwinds a task cleanly (`Interrupted`) or aborts the run.

use thiserror::Error;

use blocksum_core::BlockId;
use blocksum_formula::FormulaError;
use blocksum_solver::SolverError;

/// Errors raised by the block-aware abstract domain while constructing
/// entry states.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Transient interruption; the engine retries while polling the
    /// shutdown signal.
    #[error("transient interruption during component state construction")]
    TransientInterrupt,

    /// Anything else is fatal to the run.
    #[error("malformed component initial state: {reason}")]
    Malformed { reason: String },
}

/// Errors surfacing from task execution to the scheduler.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Cooperative shutdown unwound the task. Leaves no partial state:
    /// tasks never write the summary store.
    #[error("analysis interrupted by shutdown request")]
    Interrupted,

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("malformed component initial state: {reason}")]
    MalformedDomain { reason: String },

    /// A request referenced a block missing from the graph.
    #[error("block {0} missing from block graph")]
    UnknownBlock(BlockId),
}
