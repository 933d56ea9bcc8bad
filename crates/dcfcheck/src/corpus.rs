use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const DEFAULT_PROGRAMS_DIR: &str = "programs/";
pub const DEFAULT_FIXTURE_SUFFIX: &str = ".dcf";

/// Fixture paths in `dir` whose file name ends with `suffix`, sorted by file
/// name so runs are reproducible and diffable.
///
/// Directories are skipped even when their name matches.
pub fn scan_corpus(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut names: Vec<OsString> = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("read corpus dir: {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("read corpus dir entry: {}", dir.display()))?;
        let name = entry.file_name();
        if !name.as_encoded_bytes().ends_with(suffix.as_bytes()) {
            continue;
        }
        if entry.path().is_dir() {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}
