//! Boundaries to the external analysis collaborators.
//!
//! The engine schedules, exchanges, and stitches; it does not compute
//! abstract states. The analysis algorithm and the block-aware abstract
//! domain plug in through these traits, mirroring the seams of a
//! generic fixed-point engine: the domain builds states, the algorithm
//! drives the worklist.

use blocksum_core::{AlgorithmStatus, Block, Location, ShutdownSignal};
use blocksum_formula::PathCondition;

use crate::error::{DomainError, EngineError};
use crate::reached::ReachedSet;

/// One abstract state in a block's reached set.
///
/// The engine inspects states only to classify them: where they sit,
/// and which condition they carry.
pub trait AbstractState: Clone + Send + Sync + 'static {
    /// The control-flow location this state denotes.
    fn location(&self) -> Location;

    /// Whether this state is an abstraction point carrying a
    /// block-level summary formula.
    fn is_abstraction_point(&self) -> bool;

    /// Block-level summary formula, meaningful at abstraction points.
    fn block_formula(&self) -> PathCondition;

    /// Raw running path formula.
    fn path_formula(&self) -> PathCondition;
}

/// The block-aware abstract domain: builds component-wise entry states
/// and precisions for a block, and injects a stitched condition into
/// the condition-bearing component.
pub trait BlockDomain: Send + Sync + 'static {
    type State: AbstractState;
    type Precision: Clone + Send + Sync + 'static;

    /// Component-wise initial state at a block entry.
    ///
    /// May raise [`DomainError::TransientInterrupt`], which the engine
    /// retries while polling the shutdown signal; any other error is
    /// fatal to the run.
    fn initial_state(&self, entry: Location, block: &Block) -> Result<Self::State, DomainError>;

    /// Initial precision at a block entry. Same retry contract as
    /// [`BlockDomain::initial_state`].
    fn initial_precision(
        &self,
        entry: Location,
        block: &Block,
    ) -> Result<Self::Precision, DomainError>;

    /// Inject a stitched condition into the condition-bearing component
    /// of `state`.
    fn inject_condition(&self, state: Self::State, condition: &PathCondition) -> Self::State;
}

/// The external state-space exploration algorithm.
///
/// Runs the reached set to a per-invocation fixed point or until the
/// shutdown signal is raised; may be invoked repeatedly against the
/// same reached set across continuations.
pub trait AnalysisAlgorithm<D: BlockDomain>: Send + Sync + 'static {
    fn run(
        &self,
        reached: &mut ReachedSet<D>,
        shutdown: &ShutdownSignal,
    ) -> Result<AlgorithmStatus, EngineError>;
}
