//! The task manager: worker pool, single-threaded finalization, and
//! message routing.
//!
//! The manager owns the summary store and the pending-request queue.
//! Requests are finalized one at a time on the loop itself, the
//! engine's only synchronization point, while admitted tasks execute
//! concurrently on the runtime, bounded by the configured worker count.
//! Task-emitted messages (propagations, continuations, completions)
//! re-enter the same pipeline, so continuation chains trampoline
//! through the queue instead of recursing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use blocksum_core::{
    AlgorithmStatus, BlockGraph, EngineConfig, RunResult, RunStats, ShutdownSignal, TaskOutcome,
    Violation,
};
use blocksum_solver::SolverOracle;

use crate::error::EngineError;
use crate::interfaces::{AnalysisAlgorithm, BlockDomain};
use crate::message::TaskMessage;
use crate::request::{Finalization, ReadyTask, TaskRequest};
use crate::store::SummaryStore;
use crate::task::BlockTask;

/// Drives one verification run over a block graph.
pub struct TaskManager<D: BlockDomain, A: AnalysisAlgorithm<D>> {
    graph: Arc<BlockGraph>,
    domain: Arc<D>,
    algorithm: Arc<A>,
    oracle: Arc<dyn SolverOracle>,
    config: Arc<EngineConfig>,
    shutdown: ShutdownSignal,
}

impl<D: BlockDomain, A: AnalysisAlgorithm<D>> TaskManager<D, A> {
    pub fn new(
        graph: BlockGraph,
        domain: D,
        algorithm: A,
        oracle: Arc<dyn SolverOracle>,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph: Arc::new(graph),
            domain: Arc::new(domain),
            algorithm: Arc::new(algorithm),
            oracle,
            config: Arc::new(config),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// The run's cooperative shutdown handle, for resource limiters.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Execute the run to completion.
    pub async fn run(self) -> RunResult {
        let started = Instant::now();
        let worker_count = self.config.worker_count.max(1);
        let (messages, mut inbox) = mpsc::unbounded_channel::<TaskMessage<D>>();

        let mut store = SummaryStore::new();
        let mut pending: VecDeque<TaskRequest<D>> = VecDeque::new();
        let mut stats = RunStats::default();
        let mut in_flight = 0usize;
        let mut status = AlgorithmStatus::sound_and_precise();
        let mut violation: Option<Violation> = None;
        let mut failure: Option<EngineError> = None;

        for target in self.graph.seed_blocks() {
            if let Some(block) = self.graph.block(target) {
                pending.push_back(TaskRequest::seed(target, block.entry));
                stats.seeds_issued += 1;
            }
        }
        info!(
            blocks = self.graph.len(),
            seeds = stats.seeds_issued,
            workers = worker_count,
            "starting block-summary propagation"
        );

        loop {
            // Finalize and launch while there is capacity. Finalization
            // happens only here, on the loop thread.
            while in_flight < worker_count && !self.shutdown.is_requested() {
                let Some(request) = pending.pop_front() else {
                    break;
                };
                match store.finalize(request) {
                    Finalization::Admitted(ready) => {
                        self.launch(ready, messages.clone());
                        in_flight += 1;
                        stats.tasks_executed += 1;
                    }
                    Finalization::Invalidated => {
                        stats.requests_invalidated += 1;
                    }
                }
            }

            if in_flight == 0 && (pending.is_empty() || self.shutdown.is_requested()) {
                break;
            }

            let Some(message) = inbox.recv().await else {
                break;
            };
            match message {
                TaskMessage::Propagate {
                    predecessor,
                    entry,
                    origin,
                    condition,
                } => {
                    if !self.shutdown.is_requested() {
                        debug!(%origin, %predecessor, "routing propagation request");
                        pending.push_back(TaskRequest::propagated(
                            predecessor,
                            entry,
                            origin,
                            condition,
                        ));
                    }
                }
                TaskMessage::Continue {
                    block,
                    entry,
                    saved,
                    observed_version,
                } => {
                    stats.continuations += 1;
                    if !self.shutdown.is_requested() {
                        debug!(%block, "routing continuation request");
                        pending.push_back(TaskRequest::continuation(
                            block,
                            entry,
                            saved,
                            observed_version,
                        ));
                    }
                }
                TaskMessage::Completed { block, completion } => {
                    in_flight -= 1;
                    match completion {
                        Ok(completion) => {
                            status = status.combine(completion.status);
                            match completion.outcome {
                                TaskOutcome::ViolationFound(found) => {
                                    info!(%block, "violation found, draining run");
                                    violation.get_or_insert(found);
                                    self.shutdown.request();
                                }
                                TaskOutcome::Finished { verdicts, .. } => {
                                    stats.edge_verdicts += verdicts.len();
                                }
                                TaskOutcome::Swallowed | TaskOutcome::Suspended { .. } => {}
                            }
                        }
                        Err(EngineError::Interrupted) => {
                            debug!(%block, "task unwound by shutdown");
                        }
                        Err(err) => {
                            warn!(%block, error = %err, "task failed, aborting run");
                            failure.get_or_insert(err);
                            self.shutdown.request();
                        }
                    }
                }
            }
        }

        stats.summaries_installed = store.summaries_installed();
        stats.elapsed = started.elapsed();

        if let Some(violation) = violation {
            RunResult::Unsafe { violation, stats }
        } else if let Some(failure) = failure {
            RunResult::Failed {
                message: failure.to_string(),
                stats,
            }
        } else if self.shutdown.is_requested() {
            RunResult::Interrupted { stats }
        } else {
            RunResult::Safe { status, stats }
        }
    }

    fn launch(&self, ready: ReadyTask<D>, messages: mpsc::UnboundedSender<TaskMessage<D>>) {
        let task = BlockTask {
            graph: Arc::clone(&self.graph),
            block: ready.target,
            entry: ready.entry,
            inherited: ready.inherited,
            saved: ready.saved,
            observed_version: ready.observed_version,
            domain: Arc::clone(&self.domain),
            algorithm: Arc::clone(&self.algorithm),
            oracle: Arc::clone(&self.oracle),
            config: Arc::clone(&self.config),
            shutdown: self.shutdown.clone(),
            messages,
        };
        tokio::spawn(task.execute());
    }
}
