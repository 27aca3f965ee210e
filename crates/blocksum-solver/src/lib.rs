//! SMT solver oracle for the blocksum engine
//!
//! The engine never builds or inspects solver state; it asks two
//! questions ("is this condition unsatisfiable?", "does this condition
//! imply that one?") through the [`SolverOracle`] trait and
//! treats everything behind it as opaque. This crate provides:
//!
//! - [`SolverOracle`]: the async oracle boundary
//! - [`SolverQuery`]: self-contained SMT-LIB2 queries built from path
//!   conditions
//! - [`Z3Oracle`]: a subprocess-based Z3 backend
//! - [`SolverFailurePolicy`]: what tasks do when a query fails

mod oracle;
mod z3;

pub use oracle::{SolverError, SolverFailurePolicy, SolverOracle, SolverQuery};
pub use z3::{find_executable, Z3Oracle};
