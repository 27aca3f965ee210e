//! Z3 oracle backend.
//!
//! Runs `z3` as a subprocess over an SMT-LIB2 query file. Each query is
//! independent; no solver state is kept between calls, which is what
//! makes the oracle safe to share across workers.

use async_trait::async_trait;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::oracle::{SolverError, SolverOracle, SolverQuery};

/// Default per-query wall-clock budget.
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Locate an executable on `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Z3 SMT solver oracle.
pub struct Z3Oracle {
    binary: PathBuf,
    query_timeout: Duration,
}

impl Z3Oracle {
    /// Create with a specific binary path.
    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: path.into(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the per-query timeout.
    pub fn with_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Detect and initialize Z3 from `PATH`, probing its version.
    pub async fn detect() -> Option<Self> {
        let binary = find_executable("z3")?;
        let oracle = Self::with_binary(binary);
        match oracle.probe_version().await {
            Some(version) => debug!(%version, "detected z3"),
            None => warn!(binary = %oracle.binary.display(), "z3 did not report a version"),
        }
        Some(oracle)
    }

    async fn probe_version(&self) -> Option<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .ok()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().next().map(|line| line.trim().to_string())
    }

    async fn run_query_file(&self, file: &Path) -> Result<String, SolverError> {
        let run = Command::new(&self.binary).arg("-smt2").arg(file).output();
        let output = match timeout(self.query_timeout, run).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SolverError::Timeout {
                    timeout: self.query_timeout,
                })
            }
        };
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "z3 stderr");
        }
        Ok(stdout)
    }
}

/// Classify a `(check-sat)` answer. Lines are matched exactly because
/// `unsat` contains `sat` as a substring.
fn parse_check_sat(stdout: &str) -> Result<bool, SolverError> {
    for line in stdout.lines() {
        match line.trim() {
            "unsat" => return Ok(true),
            "sat" => return Ok(false),
            "unknown" => {
                return Err(SolverError::Unknown {
                    reason: "solver answered unknown".to_string(),
                })
            }
            _ => continue,
        }
    }
    Err(SolverError::UnexpectedOutput {
        output: stdout.trim().to_string(),
    })
}

#[async_trait]
impl SolverOracle for Z3Oracle {
    async fn is_unsat(&self, query: &SolverQuery) -> Result<bool, SolverError> {
        let mut file = tempfile::Builder::new()
            .prefix("blocksum-query-")
            .suffix(".smt2")
            .tempfile()?;
        file.write_all(query.to_smt2().as_bytes())?;
        file.flush()?;
        let stdout = self.run_query_file(file.path()).await?;
        parse_check_sat(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksum_formula::{MemoryFootprint, PathCondition, SmtType, SsaMap};

    #[test]
    fn test_parse_unsat() {
        assert!(parse_check_sat("unsat\n").unwrap());
    }

    #[test]
    fn test_parse_sat() {
        assert!(!parse_check_sat("sat\n").unwrap());
    }

    #[test]
    fn test_parse_skips_diagnostic_lines() {
        let stdout = "(warning: ignoring unsupported option)\nunsat\n";
        assert!(parse_check_sat(stdout).unwrap());
    }

    #[test]
    fn test_parse_unknown_is_a_failure() {
        let err = parse_check_sat("unknown\n").unwrap_err();
        assert!(matches!(err, SolverError::Unknown { .. }));
    }

    #[test]
    fn test_parse_garbage_is_unexpected() {
        let err = parse_check_sat("segmentation fault\n").unwrap_err();
        assert!(matches!(err, SolverError::UnexpectedOutput { .. }));
    }

    fn int_condition(formula: &str, vars: &[(&str, u32)]) -> PathCondition {
        let mut ssa = SsaMap::new();
        for (name, version) in vars {
            ssa.insert(*name, SmtType::Int, *version);
        }
        PathCondition::new(formula, ssa, MemoryFootprint::new())
    }

    // Exercised only when a z3 binary is installed; skipped otherwise.
    #[tokio::test]
    async fn test_z3_end_to_end_if_available() {
        let Some(oracle) = Z3Oracle::detect().await else {
            eprintln!("z3 not found, skipping");
            return;
        };
        let contradiction = int_condition("(and (= x_1 0) (= x_1 1))", &[("x", 1)]);
        let query = SolverQuery::satisfiability(&contradiction);
        assert!(oracle.is_unsat(&query).await.unwrap());

        let satisfiable = int_condition("(= x_1 1)", &[("x", 1)]);
        let query = SolverQuery::satisfiability(&satisfiable);
        assert!(!oracle.is_unsat(&query).await.unwrap());
    }
}
