use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::annotation::Expected;
use crate::harness::RunSummary;
use crate::verify::TestOutcome;

pub const DCFCHECK_REPORT_SCHEMA_VERSION: &str = "dcfcheck.report@0.1.0";

const CAPTURED_OUTPUT_LIMIT: usize = 4096;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub invocation: InvocationInfo,
    pub summary: Summary,
    pub tests: Vec<TestCaseResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InvocationInfo {
    pub argv: Vec<String>,
    pub cwd: String,
    pub started_at_unix_ms: u64,
    pub programs_dir: String,
    pub compiler: String,
    pub assembler: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: u64,
    pub failed: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestCaseResult {
    pub fixture: String,
    pub status: String,
    /// A JSON number, or a decimal string when it does not fit `i64`.
    pub expected: Expected,
    pub observed: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_signal: Option<i32>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl TestCaseResult {
    pub fn from_outcome(outcome: &TestOutcome) -> Self {
        Self {
            fixture: outcome.fixture.display().to_string(),
            status: if outcome.passed { "pass" } else { "fail" }.to_string(),
            expected: outcome.expected.clone(),
            observed: outcome.observed,
            exit_signal: outcome.exit_signal,
            duration_ms: duration_ms(outcome.duration),
            stdout: captured_text(&outcome.stdout),
            stderr: captured_text(&outcome.stderr),
        }
    }
}

impl RunReport {
    pub fn new(summary: &RunSummary, invocation: InvocationInfo) -> Self {
        Self {
            schema_version: DCFCHECK_REPORT_SCHEMA_VERSION.to_string(),
            tool: ToolInfo::default(),
            invocation,
            summary: Summary {
                passed: summary.passed() as u64,
                failed: summary.failed() as u64,
                duration_ms: duration_ms(summary.duration),
            },
            tests: summary
                .outcomes
                .iter()
                .map(TestCaseResult::from_outcome)
                .collect(),
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    let mut bytes = serde_json::to_vec_pretty(report).context("serialize run report")?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).with_context(|| format!("write report: {}", path.display()))
}

fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn captured_text(bytes: &[u8]) -> String {
    let bytes = if bytes.len() > CAPTURED_OUTPUT_LIMIT {
        &bytes[..CAPTURED_OUTPUT_LIMIT]
    } else {
        bytes
    };
    String::from_utf8_lossy(bytes).into_owned()
}
