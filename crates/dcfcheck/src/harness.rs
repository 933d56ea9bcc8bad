use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use dcfcheck_proc::{ArtifactDir, ProcessRunner};

use crate::annotation::read_expected_return_value;
use crate::assembler::Assembler;
use crate::compiler::Compiler;
use crate::corpus::scan_corpus;
use crate::verify::{run_executable, verify, TestOutcome};

pub const EXIT_ALL_PASSED: u8 = 0;
pub const EXIT_FAILURES: u8 = 1;
pub const EXIT_FATAL: u8 = 2;

const ARTIFACT_DIR_PREFIX: &str = "dcfcheck";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub programs_dir: PathBuf,
    pub suffix: String,
    pub compiler: Compiler,
    pub assembler: Assembler,
    /// Echo every child command line to stderr.
    pub echo_commands: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<TestOutcome>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// True for an empty corpus.
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn exit_code(&self) -> u8 {
        if self.all_passed() {
            EXIT_ALL_PASSED
        } else {
            EXIT_FAILURES
        }
    }
}

pub struct Harness {
    config: HarnessConfig,
    runner: ProcessRunner,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        let runner = ProcessRunner::new(config.echo_commands);
        Self { config, runner }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Annotation, compile, assemble, run, compare, for one fixture.
    ///
    /// `Err` means the run must stop: the fixture is malformed or the
    /// toolchain rejected it. A wrong exit code is an `Ok` outcome with
    /// `passed == false`.
    pub fn check_fixture(&self, fixture: &Path) -> Result<TestOutcome> {
        let start = Instant::now();
        let expected = read_expected_return_value(fixture)?;

        let assembly = self
            .config
            .compiler
            .compile_to_assembly(&self.runner, fixture)?;

        let tmp = ArtifactDir::create(&std::env::temp_dir(), ARTIFACT_DIR_PREFIX)?;
        let exe = tmp.executable_path(&artifact_stem(fixture));
        self.config
            .assembler
            .assemble(&self.runner, &assembly, &exe)
            .with_context(|| format!("assemble output of {}", fixture.display()))?;
        drop(assembly);

        let execution = run_executable(&self.runner, &exe)?;
        let mut outcome = verify(fixture, expected, execution);
        outcome.duration = start.elapsed();
        Ok(outcome)
    }

    /// Checks every fixture in the corpus, writing one report line to `out`
    /// as each finishes.
    ///
    /// Failing fixtures do not stop the scan. Any error aborts immediately;
    /// lines already written stay written but no summary is returned.
    pub fn run(&self, out: &mut dyn Write) -> Result<RunSummary> {
        let start = Instant::now();
        let fixtures = scan_corpus(&self.config.programs_dir, &self.config.suffix)?;

        let mut outcomes = Vec::with_capacity(fixtures.len());
        for fixture in &fixtures {
            let outcome = self.check_fixture(fixture)?;
            writeln!(out, "{outcome}").context("write report line")?;
            out.flush().context("flush report line")?;
            outcomes.push(outcome);
        }

        Ok(RunSummary {
            outcomes,
            duration: start.elapsed(),
        })
    }
}

fn artifact_stem(fixture: &Path) -> String {
    let stem = fixture
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "program".to_string()
    } else {
        stem
    }
}
