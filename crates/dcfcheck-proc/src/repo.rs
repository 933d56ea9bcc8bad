use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

use crate::process::{ensure_success, ProcessRunner};

/// Root of the git checkout containing the current directory.
pub fn repo_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("get current dir")?;
    repo_root_from(&cwd)
}

pub fn repo_root_from(dir: &Path) -> Result<PathBuf> {
    let mut cmd = Command::new("git");
    cmd.args(["rev-parse", "--show-toplevel"]);
    cmd.current_dir(dir);

    let out = ProcessRunner::default()
        .run(cmd, None)
        .context("invoke git (is it installed?)")?;
    ensure_success("git rev-parse --show-toplevel", &out)
        .with_context(|| format!("locate repository root from {}", dir.display()))?;

    parse_toplevel(&out.stdout)
        .with_context(|| format!("locate repository root from {}", dir.display()))
}

fn parse_toplevel(stdout: &[u8]) -> Result<PathBuf> {
    let text = std::str::from_utf8(stdout).context("git printed a non-UTF-8 path")?;
    let text = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
    if text.is_empty() {
        anyhow::bail!("git printed an empty repository root");
    }
    Ok(PathBuf::from(text))
}
