//! The summary store: the engine's only shared mutable state.
//!
//! The store is owned by the scheduler loop and mutated exclusively
//! inside [`SummaryStore::finalize`], which runs on that single thread.
//! Task execution is parallel, but tasks never hold a reference to the
//! store; the single-writer discipline replaces fine-grained locking.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use blocksum_core::{BlockId, Location};
use blocksum_formula::DetachedCondition;

use crate::interfaces::BlockDomain;
use crate::request::{Finalization, ReadyTask, RequestOrigin, TaskRequest};

/// Shared summary state for one verification run.
#[derive(Debug, Default)]
pub struct SummaryStore {
    /// Latest exchanged condition per (target block, source block)
    /// edge. Replacement is monotonic in finalization order: the last
    /// finalized request wins.
    table: HashMap<(BlockId, BlockId), DetachedCondition>,
    /// Per target-block version counter, bumped whenever one of its
    /// table entries changes. Continuations are admitted only while the
    /// version they observed is still current.
    versions: HashMap<BlockId, u64>,
    /// Entry locations already seeded with the trivial condition.
    seeded: HashSet<Location>,
    installs: usize,
}

impl SummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a request against the current shared state.
    ///
    /// This is the engine's only synchronization point; it both reads
    /// and conditionally writes the store and therefore must run on the
    /// designated scheduling thread.
    pub fn finalize<D: BlockDomain>(&mut self, request: TaskRequest<D>) -> Finalization<D> {
        let TaskRequest {
            target,
            entry,
            origin,
        } = request;
        match origin {
            RequestOrigin::Seed => {
                if !self.seeded.insert(entry) {
                    debug!(block = %target, %entry, "seed already issued, dropping request");
                    return Finalization::Invalidated;
                }
                Finalization::Admitted(ReadyTask {
                    target,
                    entry,
                    inherited: DetachedCondition::trivial(),
                    saved: None,
                    observed_version: self.version(target),
                })
            }
            RequestOrigin::Propagated { from, condition } => {
                let slot = self.table.get(&(target, from));
                if slot != Some(&condition) {
                    *self.versions.entry(target).or_insert(0) += 1;
                }
                self.table.insert((target, from), condition.clone());
                self.installs += 1;
                debug!(block = %target, source = %from, version = self.version(target), "summary installed");
                Finalization::Admitted(ReadyTask {
                    target,
                    entry,
                    inherited: condition,
                    saved: None,
                    observed_version: self.version(target),
                })
            }
            RequestOrigin::Continuation {
                saved,
                observed_version,
            } => {
                if self.version(target) != observed_version {
                    debug!(
                        block = %target,
                        observed_version,
                        current = self.version(target),
                        "stale continuation, dropping request"
                    );
                    return Finalization::Invalidated;
                }
                Finalization::Admitted(ReadyTask {
                    target,
                    entry,
                    inherited: saved.inherited,
                    saved: Some(saved.reached),
                    observed_version,
                })
            }
        }
    }

    /// Current summary for the edge (target, source), if any.
    pub fn summary(&self, target: BlockId, source: BlockId) -> Option<&DetachedCondition> {
        self.table.get(&(target, source))
    }

    /// Current summary version of a target block.
    pub fn version(&self, target: BlockId) -> u64 {
        self.versions.get(&target).copied().unwrap_or(0)
    }

    /// Total number of table installs performed.
    pub fn summaries_installed(&self) -> usize {
        self.installs
    }
}
