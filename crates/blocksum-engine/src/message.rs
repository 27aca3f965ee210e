//! Messages tasks send back to the scheduler.
//!
//! Tasks never touch shared state; everything they want from the rest
//! of the system (propagation toward predecessors, continuation of
//! their own exploration, completion reporting) travels as a message
//! through the scheduler's channel and re-enters the request pipeline
//! there (a trampoline, so continuation depth never grows the stack).

use blocksum_core::{BlockId, Location, TaskCompletion};
use blocksum_formula::DetachedCondition;

use crate::error::EngineError;
use crate::interfaces::BlockDomain;
use crate::reached::ReachedSet;

/// A paused exploration: the pruned reached set a continuation resumes
/// from, together with the condition the original task inherited.
#[derive(Debug)]
pub struct SavedExploration<D: BlockDomain> {
    pub reached: ReachedSet<D>,
    pub inherited: DetachedCondition,
}

/// Task-to-scheduler messages.
#[derive(Debug)]
pub enum TaskMessage<D: BlockDomain> {
    /// Propagate a freshly computed condition toward a predecessor
    /// block.
    Propagate {
        predecessor: BlockId,
        entry: Location,
        origin: BlockId,
        condition: DetachedCondition,
    },

    /// Resume this block's exploration later, from a saved reached set.
    Continue {
        block: BlockId,
        entry: Location,
        saved: SavedExploration<D>,
        /// The target block's summary version the exploration was
        /// computed against; finalization uses it to detect staleness.
        observed_version: u64,
    },

    /// The task finished (successfully or not).
    Completed {
        block: BlockId,
        completion: Result<TaskCompletion, EngineError>,
    },
}
