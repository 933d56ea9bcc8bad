use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use dcfcheck_proc::{ensure_success, ProcessRunner, ToolCommand};

/// Compiler entry point, relative to the repository root.
pub const RUNNER_SCRIPT_BASENAME: &str = "run.sh";
pub const TARGET_FLAG: &str = "-t";
pub const DEFAULT_TARGET: &str = "assembly";

/// The compiler under test, run as `<command> -t <target> <fixture>`.
#[derive(Debug, Clone)]
pub struct Compiler {
    pub command: ToolCommand,
    pub target: String,
    /// Present when `command.program` is relative to the git repository
    /// root; filled in the first time a fixture is compiled.
    repo_root: Option<OnceLock<PathBuf>>,
}

impl Compiler {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            target: DEFAULT_TARGET.to_string(),
            repo_root: None,
        }
    }

    /// `<repo root>/run.sh` with leading `args`. Nothing runs until the first
    /// fixture, so an empty corpus needs no repository.
    pub fn in_repo_root<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            repo_root: Some(OnceLock::new()),
            ..Self::new(ToolCommand::new(RUNNER_SCRIPT_BASENAME).with_args(args))
        }
    }

    /// The entry point to run, locating the repository root if needed.
    pub fn program(&self) -> Result<PathBuf> {
        let Some(root) = &self.repo_root else {
            return Ok(self.command.program.clone());
        };
        if let Some(root) = root.get() {
            return Ok(root.join(&self.command.program));
        }
        let found = dcfcheck_proc::repo::repo_root()
            .context("locate compiler entry point (pass --compiler to override)")?;
        Ok(root.get_or_init(|| found).join(&self.command.program))
    }

    /// Human-readable command line, without locating anything.
    pub fn describe(&self) -> String {
        let program = match self.repo_root.as_ref().map(OnceLock::get) {
            Some(Some(root)) => root.join(&self.command.program),
            Some(None) => Path::new("<repo root>").join(&self.command.program),
            None => self.command.program.clone(),
        };
        let mut cmd = Command::new(program);
        cmd.args(&self.command.args);
        dcfcheck_proc::process::describe_command(&cmd)
    }

    pub fn command_for(&self, fixture: &Path) -> Result<Command> {
        let mut cmd = Command::new(self.program()?);
        cmd.args(&self.command.args);
        cmd.arg(TARGET_FLAG);
        cmd.arg(&self.target);
        cmd.arg(fixture);
        Ok(cmd)
    }

    /// Assembly text for `fixture`, exactly as the compiler printed it.
    ///
    /// Diagnostics on stderr are kept out of the returned text. A non-zero
    /// exit is an error: the corpus only holds programs the compiler must
    /// accept.
    pub fn compile_to_assembly(&self, runner: &ProcessRunner, fixture: &Path) -> Result<String> {
        let cmd = self.command_for(fixture)?;
        let out = runner
            .run(cmd, None)
            .with_context(|| format!("invoke compiler: {}", self.command.program.display()))?;
        ensure_success("compiler", &out)
            .with_context(|| format!("compile fixture: {}", fixture.display()))?;
        String::from_utf8(out.stdout)
            .with_context(|| format!("compiler emitted non-UTF-8 output for {}", fixture.display()))
    }
}
