//! Child-process plumbing shared by the dcfcheck harness: typed process
//! results, scoped artifact directories and repository discovery.

pub mod process;
pub mod repo;
pub mod temp;

pub use process::{ensure_success, ProcessOutput, ProcessRunner, ToolCommand};
pub use temp::ArtifactDir;
