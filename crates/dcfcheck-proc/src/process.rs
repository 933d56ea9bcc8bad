use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use anyhow::{Context, Result};

const STDERR_TAIL_LIMIT: usize = 4096;

/// An external tool: the program to run plus arguments that precede every
/// invocation-specific argument (`java -jar dcf.jar`, `/bin/sh run.sh`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// A fresh `Command` with the program and leading arguments applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `128 + signal` when the child was killed by a signal.
    pub exit_status: i32,
    pub exit_signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_signal.is_none() && self.exit_status == 0
    }

    pub fn stderr_tail(&self) -> String {
        String::from_utf8_lossy(&tail_truncate(&self.stderr, STDERR_TAIL_LIMIT)).into_owned()
    }
}

/// Spawns child processes and blocks until they exit.
///
/// With `echo` set, each command line is written to stderr before it runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    pub echo: bool,
}

impl ProcessRunner {
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }

    /// Runs `cmd` to completion, capturing stdout and stderr separately.
    ///
    /// `stdin` is fed from a helper thread so a child that writes a lot of
    /// output before draining its input cannot deadlock against us. Without
    /// input the child's stdin is `/dev/null`.
    pub fn run(&self, mut cmd: Command, stdin: Option<&[u8]>) -> Result<ProcessOutput> {
        if self.echo {
            eprintln!("+ {}", describe_command(&cmd));
        }

        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {:?}", cmd.get_program()))?;

        let stdin_thread = match stdin {
            Some(input) => {
                let mut pipe = child.stdin.take().context("take stdin")?;
                let input = input.to_vec();
                Some(std::thread::spawn(move || -> std::io::Result<()> {
                    pipe.write_all(&input)?;
                    pipe.flush()?;
                    drop(pipe);
                    Ok(())
                }))
            }
            None => None,
        };

        let out = child
            .wait_with_output()
            .with_context(|| format!("wait for {:?}", cmd.get_program()))?;

        if let Some(handle) = stdin_thread {
            join_stdin_writer(handle)
                .with_context(|| format!("write stdin of {:?}", cmd.get_program()))?;
        }

        let (exit_status, exit_signal) = decode_exit_status(out.status);
        Ok(ProcessOutput {
            exit_status,
            exit_signal,
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}

/// Fails with the tool name, exit status and stderr tail unless `out` is a
/// clean zero exit.
pub fn ensure_success(tool: &str, out: &ProcessOutput) -> Result<()> {
    if out.success() {
        return Ok(());
    }
    let status = match out.exit_signal {
        Some(signal) => format!("signal={signal}"),
        None => format!("exit={}", out.exit_status),
    };
    let stderr = out.stderr_tail();
    if stderr.trim().is_empty() {
        anyhow::bail!("{tool} failed ({status})");
    }
    anyhow::bail!("{tool} failed ({status})\nstderr:\n{}", stderr.trim_end())
}

/// The child may exit without reading all of its input; its exit status is
/// what gets reported then, so a broken pipe is not an error here.
fn join_stdin_writer(handle: JoinHandle<std::io::Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => anyhow::bail!("stdin writer thread panicked"),
    }
}

pub fn describe_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn decode_exit_status(status: ExitStatus) -> (i32, Option<i32>) {
    #[cfg(unix)]
    let exit_signal = {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    };
    #[cfg(not(unix))]
    let exit_signal: Option<i32> = None;

    let exit_status = match status.code() {
        Some(code) => code,
        None => exit_signal.map(|s| 128 + s).unwrap_or(1),
    };
    (exit_status, exit_signal)
}

fn tail_truncate(b: &[u8], limit: usize) -> Vec<u8> {
    if b.len() <= limit {
        return b.to_vec();
    }
    let start = b.len() - limit;
    let mut out = b"...\n".to_vec();
    out.extend_from_slice(&b[start..]);
    out
}
