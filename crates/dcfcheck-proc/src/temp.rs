use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Leftovers from an earlier process with the same pid can occupy a name;
/// give up after skipping this many.
const MAX_NAME_COLLISIONS: usize = 64;

/// Scratch directory for one fixture's build artifacts, named
/// `{prefix}_{pid}_{n}` and deleted with its contents on drop.
#[derive(Debug)]
pub struct ArtifactDir {
    path: PathBuf,
}

impl ArtifactDir {
    pub fn create(base: &Path, prefix: &str) -> Result<Self> {
        let pid = std::process::id();
        let candidates = (0..MAX_NAME_COLLISIONS).map(|_| {
            let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
            base.join(format!("{prefix}_{pid}_{n}"))
        });
        for path in candidates {
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok(Self { path }),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("create artifact dir: {}", path.display()));
                }
            }
        }
        anyhow::bail!(
            "no free artifact dir name for {prefix:?} under {}",
            base.display()
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `stem` inside this directory, with the platform's executable extension.
    pub fn executable_path(&self, stem: &str) -> PathBuf {
        let mut p = self.path.join(stem);
        if !std::env::consts::EXE_EXTENSION.is_empty() {
            p.set_extension(std::env::consts::EXE_EXTENSION);
        }
        p
    }
}

impl Drop for ArtifactDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
