//! Engine configuration.
//!
//! One explicit configuration value is constructed by the orchestration
//! layer and handed to the task manager; nothing here is global or
//! lazily initialized.

use serde::{Deserialize, Serialize};

use blocksum_formula::StitchStrategy;
use blocksum_solver::SolverFailurePolicy;

/// Configuration for one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of block-analysis tasks in flight at once.
    pub worker_count: usize,

    /// Offset strategy for stitching an inherited condition onto a
    /// block's local summary at task entry.
    pub entry_stitch: StitchStrategy,

    /// Offset strategy for stitching an extracted condition with the
    /// inherited one during classification.
    pub classify_stitch: StitchStrategy,

    /// What tasks do when a solver query fails.
    pub solver_failure: SolverFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            entry_stitch: StitchStrategy::Handoff,
            classify_stitch: StitchStrategy::Aligned,
            solver_failure: SolverFailurePolicy::Surface,
        }
    }
}

/// Builder for [`EngineConfig`].
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Set the worker-pool bound.
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set the entry-side stitch strategy.
    pub fn with_entry_stitch(mut self, strategy: StitchStrategy) -> Self {
        self.config.entry_stitch = strategy;
        self
    }

    /// Set the classification-side stitch strategy.
    pub fn with_classify_stitch(mut self, strategy: StitchStrategy) -> Self {
        self.config.classify_stitch = strategy;
        self
    }

    /// Set the solver-failure policy.
    pub fn with_solver_failure(mut self, policy: SolverFailurePolicy) -> Self {
        self.config.solver_failure = policy;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
