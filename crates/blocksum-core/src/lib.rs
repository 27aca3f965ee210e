//! Core types for the blocksum engine
//!
//! This crate provides the shared vocabulary of the block-summary
//! propagation engine:
//!
//! - [`BlockGraph`]: the immutable decomposition of a control-flow
//!   graph into blocks, with precomputed per-block properties
//! - [`EngineConfig`]: one explicit configuration value per run
//! - [`RunResult`]/[`TaskOutcome`]: verdicts and outcomes
//! - [`ShutdownSignal`]: cooperative cancellation

mod block;
mod config;
mod result;
mod shutdown;

pub use block::{Block, BlockGraph, BlockGraphBuilder, BlockId, GraphError, Location};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use result::{
    AlgorithmStatus, EdgeVerdict, RunResult, RunStats, TaskCompletion, TaskOutcome, Violation,
};
pub use shutdown::ShutdownSignal;
