use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use dcfcheck_proc::{ProcessOutput, ProcessRunner};

use crate::annotation::Expected;

/// Runs a freshly assembled program with no arguments and waits for it.
pub fn run_executable(runner: &ProcessRunner, exe: &Path) -> Result<ProcessOutput> {
    let exe_abs = std::fs::canonicalize(exe)
        .with_context(|| format!("canonicalize executable path: {}", exe.display()))?;
    runner
        .run(Command::new(&exe_abs), None)
        .with_context(|| format!("run executable: {}", exe.display()))
}

/// Result of one fixture. A mismatch here is the only failure that does not
/// stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub fixture: PathBuf,
    pub expected: Expected,
    pub observed: i32,
    pub exit_signal: Option<i32>,
    pub passed: bool,
    pub duration: Duration,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

pub fn verify(fixture: &Path, expected: Expected, execution: ProcessOutput) -> TestOutcome {
    TestOutcome {
        fixture: fixture.to_path_buf(),
        passed: expected.matches(execution.exit_status),
        expected,
        observed: execution.exit_status,
        exit_signal: execution.exit_signal,
        duration: Duration::ZERO,
        stdout: execution.stdout,
        stderr: execution.stderr,
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            write!(f, "File {}: PASS", self.fixture.display())
        } else {
            write!(
                f,
                "File {}: FAIL (Exp: {}. Got: {})",
                self.fixture.display(),
                self.expected,
                self.observed
            )
        }
    }
}
