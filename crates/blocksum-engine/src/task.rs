//! The block-analysis task state machine.
//!
//! A task moves through `Built -> Stitching -> Exploring ->
//! Classifying` and ends in one of `Propagating`, `VerdictReached`, or
//! `ContinuationNeeded`. It owns its reached set and formula context
//! exclusively, mutates nothing shared, and talks to the rest of the
//! engine only by sending [`TaskMessage`]s.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use blocksum_core::{
    AlgorithmStatus, Block, BlockGraph, BlockId, EdgeVerdict, EngineConfig, Location,
    ShutdownSignal, TaskCompletion, TaskOutcome, Violation,
};
use blocksum_formula::{stitch, DetachedCondition, FormulaContext, PathCondition};
use blocksum_solver::{SolverError, SolverFailurePolicy, SolverOracle, SolverQuery};

use crate::error::{DomainError, EngineError};
use crate::interfaces::{AbstractState, AnalysisAlgorithm, BlockDomain};
use crate::message::{SavedExploration, TaskMessage};
use crate::reached::ReachedSet;

/// The condition a state contributes at classification time: the
/// block-level summary formula at abstraction points, the raw running
/// path formula otherwise.
pub(crate) fn extract_condition<S: AbstractState>(state: &S) -> PathCondition {
    if state.is_abstraction_point() {
        state.block_formula()
    } else {
        state.path_formula()
    }
}

/// One executable block-analysis task.
pub(crate) struct BlockTask<D: BlockDomain, A: AnalysisAlgorithm<D>> {
    pub graph: Arc<BlockGraph>,
    pub block: BlockId,
    pub entry: Location,
    pub inherited: DetachedCondition,
    pub saved: Option<ReachedSet<D>>,
    pub observed_version: u64,
    pub domain: Arc<D>,
    pub algorithm: Arc<A>,
    pub oracle: Arc<dyn SolverOracle>,
    pub config: Arc<EngineConfig>,
    pub shutdown: ShutdownSignal,
    pub messages: mpsc::UnboundedSender<TaskMessage<D>>,
}

impl<D: BlockDomain, A: AnalysisAlgorithm<D>> BlockTask<D, A> {
    /// Run the task to completion and report it to the scheduler.
    pub(crate) async fn execute(mut self) {
        let block = self.block;
        let completion = self.run().await;
        let _ = self.messages.send(TaskMessage::Completed { block, completion });
    }

    async fn run(&mut self) -> Result<TaskCompletion, EngineError> {
        let graph = Arc::clone(&self.graph);
        let block = graph
            .block(self.block)
            .ok_or(EngineError::UnknownBlock(self.block))?;

        let mut context = FormulaContext::new();
        let inherited = self.inherited.attach(&mut context)?;
        let mut status = AlgorithmStatus::sound_and_precise();

        let mut reached = match self.saved.take() {
            // Continuations resume a paused exploration directly.
            Some(reached) => reached,
            None => match self.stitch_entry(block, &mut context, &inherited).await? {
                Some(reached) => reached,
                None => {
                    debug!(block = %block.id, "incoming condition swallowed");
                    return Ok(TaskCompletion {
                        status,
                        outcome: TaskOutcome::Swallowed,
                    });
                }
            },
        };

        // Exploring: run to a per-invocation fixed point or until the
        // shutdown signal is raised inside the algorithm.
        if self.shutdown.is_requested() {
            return Err(EngineError::Interrupted);
        }
        status = status.combine(self.algorithm.run(&mut reached, &self.shutdown)?);
        if self.shutdown.is_requested() {
            return Err(EngineError::Interrupted);
        }

        // Classifying: every reached state at the block entry yields an
        // extracted condition.
        let mut propagated = 0usize;
        let mut verdicts = Vec::new();
        let arrived: Vec<D::State> = reached
            .states()
            .iter()
            .filter(|state| state.location() == block.entry)
            .cloned()
            .collect();
        for state in &arrived {
            let extracted = extract_condition(state);
            let condition = stitch(&extracted, &inherited, self.config.classify_stitch)?;
            if block.is_root() {
                match self.check_verdict(block, &condition).await? {
                    EdgeVerdict::Unsatisfiable => verdicts.push(EdgeVerdict::Unsatisfiable),
                    EdgeVerdict::Satisfiable => {
                        let violation = Violation {
                            block: block.id,
                            entry: block.entry,
                            condition: DetachedCondition::detach(&condition),
                        };
                        return Ok(TaskCompletion {
                            status,
                            outcome: TaskOutcome::ViolationFound(violation),
                        });
                    }
                }
            } else {
                let detached = DetachedCondition::detach(&condition);
                for predecessor in &block.predecessors {
                    let entry = graph
                        .block(*predecessor)
                        .ok_or(EngineError::UnknownBlock(*predecessor))?
                        .entry;
                    let _ = self.messages.send(TaskMessage::Propagate {
                        predecessor: *predecessor,
                        entry,
                        origin: block.id,
                        condition: detached.clone(),
                    });
                    propagated += 1;
                }
            }
        }

        // One more shutdown poll after classification.
        if self.shutdown.is_requested() {
            return Err(EngineError::Interrupted);
        }

        if !reached.is_settled() {
            let pruned = reached.into_continuation(block.entry, block.entry_is_loop_head);
            let saved = SavedExploration {
                reached: pruned,
                inherited: self.inherited.clone(),
            };
            let _ = self.messages.send(TaskMessage::Continue {
                block: block.id,
                entry: block.entry,
                saved,
                observed_version: self.observed_version,
            });
            return Ok(TaskCompletion {
                status,
                outcome: TaskOutcome::Suspended { propagated },
            });
        }

        Ok(TaskCompletion {
            status,
            outcome: TaskOutcome::Finished {
                propagated,
                verdicts,
            },
        })
    }

    /// Stitching phase: combine the inherited condition with the
    /// block's local summary, bail out if the combination is already
    /// unsatisfiable, and otherwise build the entry reached set with
    /// the stitched condition injected.
    ///
    /// Returns `None` when the incoming condition is swallowed.
    async fn stitch_entry(
        &self,
        block: &Block,
        context: &mut FormulaContext,
        inherited: &PathCondition,
    ) -> Result<Option<ReachedSet<D>>, EngineError> {
        let local = match &block.local_summary {
            Some(summary) => summary.attach(context)?,
            None => PathCondition::trivial(),
        };
        let entry_condition = stitch(&local, inherited, self.config.entry_stitch)?;

        if !entry_condition.is_trivial() {
            let query = SolverQuery::satisfiability(&entry_condition);
            match self.oracle.is_unsat(&query).await {
                Ok(true) => return Ok(None),
                Ok(false) => {}
                Err(err) => self.handle_solver_failure(block.id, err)?,
            }
        }

        let initial = self
            .retry_transient(|| self.domain.initial_state(self.entry, block))
            .await?;
        let precision = self
            .retry_transient(|| self.domain.initial_precision(self.entry, block))
            .await?;
        let state = self.domain.inject_condition(initial, &entry_condition);
        Ok(Some(ReachedSet::new(precision, state)))
    }

    /// Ask the solver whether an extracted condition at a
    /// predecessor-less block is unsatisfiable.
    async fn check_verdict(
        &self,
        block: &Block,
        condition: &PathCondition,
    ) -> Result<EdgeVerdict, EngineError> {
        let query = SolverQuery::satisfiability(condition);
        match self.oracle.is_unsat(&query).await {
            Ok(true) => {
                debug!(block = %block.id, "{}", EdgeVerdict::Unsatisfiable);
                Ok(EdgeVerdict::Unsatisfiable)
            }
            Ok(false) => Ok(EdgeVerdict::Satisfiable),
            Err(err) => {
                self.handle_solver_failure(block.id, err)?;
                // Compatibility fallback: the failed check counts as
                // "no violation", which is unsound.
                Ok(EdgeVerdict::Unsatisfiable)
            }
        }
    }

    /// Apply the configured solver-failure policy.
    fn handle_solver_failure(&self, block: BlockId, err: SolverError) -> Result<(), EngineError> {
        match self.config.solver_failure {
            SolverFailurePolicy::Surface => Err(EngineError::Solver(err)),
            SolverFailurePolicy::AssumeUnreachable => {
                warn!(%block, error = %err, "solver failure treated as unreachable");
                Ok(())
            }
        }
    }

    /// Retry transient domain interruptions, polling the shutdown
    /// signal between attempts.
    async fn retry_transient<T>(
        &self,
        mut build: impl FnMut() -> Result<T, DomainError>,
    ) -> Result<T, EngineError> {
        loop {
            if self.shutdown.is_requested() {
                return Err(EngineError::Interrupted);
            }
            match build() {
                Ok(value) => return Ok(value),
                Err(DomainError::TransientInterrupt) => tokio::task::yield_now().await,
                Err(DomainError::Malformed { reason }) => {
                    return Err(EngineError::MalformedDomain { reason })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TwoFormulaState {
        abstraction_point: bool,
    }

    impl AbstractState for TwoFormulaState {
        fn location(&self) -> Location {
            Location(0)
        }
        fn is_abstraction_point(&self) -> bool {
            self.abstraction_point
        }
        fn block_formula(&self) -> PathCondition {
            PathCondition::new(
                "(block)",
                blocksum_formula::SsaMap::new(),
                blocksum_formula::MemoryFootprint::new(),
            )
        }
        fn path_formula(&self) -> PathCondition {
            PathCondition::new(
                "(path)",
                blocksum_formula::SsaMap::new(),
                blocksum_formula::MemoryFootprint::new(),
            )
        }
    }

    #[test]
    fn test_extraction_prefers_block_formula_at_abstraction_points() {
        let state = TwoFormulaState {
            abstraction_point: true,
        };
        assert_eq!(extract_condition(&state).formula(), "(block)");
    }

    #[test]
    fn test_extraction_falls_back_to_path_formula() {
        let state = TwoFormulaState {
            abstraction_point: false,
        };
        assert_eq!(extract_condition(&state).formula(), "(path)");
    }
}
