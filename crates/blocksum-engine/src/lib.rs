//! Concurrent block-summary propagation engine
//!
//! This crate is the core of blocksum: it proves or refutes
//! reachability of an error condition over a block graph by analyzing
//! each block as an independently schedulable task and propagating
//! symbolic summaries between adjacent blocks until the condition is
//! unsatisfiable everywhere or a concrete violation is found.
//!
//! # Architecture
//!
//! - [`TaskManager`]: seeds the error-side frontier, finalizes task
//!   requests on a single thread, executes admitted tasks on a bounded
//!   worker pool, and routes task messages back into the pipeline
//! - [`SummaryStore`]: the only shared mutable state (the summary
//!   table, per-block version counters, and the seeded-location set),
//!   mutated exclusively during finalization
//! - `BlockTask`: the per-block state machine (`Built -> Stitching ->
//!   Exploring -> Classifying -> {Propagating | VerdictReached |
//!   ContinuationNeeded}`)
//! - [`ReachedSet`]: one block exploration's states and waitlist
//!
//! The abstract domain, the exploration algorithm, and the SMT solver
//! are external collaborators plugged in through [`BlockDomain`],
//! [`AnalysisAlgorithm`], and `SolverOracle`.
//!
//! # Example
//!
//! ```ignore
//! use blocksum_core::{BlockGraphBuilder, EngineConfig};
//! use blocksum_engine::TaskManager;
//! use blocksum_solver::Z3Oracle;
//! use std::sync::Arc;
//!
//! let graph = BlockGraphBuilder::new()
//!     .block(0, 0)
//!     .block(1, 10)
//!     .edge(0, 1)
//!     .build()?;
//! let oracle = Arc::new(Z3Oracle::detect().await.expect("z3 on PATH"));
//! let manager = TaskManager::new(graph, domain, algorithm, oracle, EngineConfig::default());
//! let result = manager.run().await;
//! println!("{result}");
//! ```

mod error;
mod interfaces;
mod message;
mod reached;
mod request;
mod scheduler;
mod store;
mod task;

pub use error::{DomainError, EngineError};
pub use interfaces::{AbstractState, AnalysisAlgorithm, BlockDomain};
pub use message::{SavedExploration, TaskMessage};
pub use reached::ReachedSet;
pub use request::{Finalization, ReadyTask, RequestOrigin, TaskRequest};
pub use scheduler::TaskManager;
pub use store::SummaryStore;
