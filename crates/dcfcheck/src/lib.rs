//! End-to-end codegen conformance harness.
//!
//! Each fixture in the corpus declares its expected exit code in a
//! `// Returns: <n>` comment. The harness compiles it to assembly with the
//! compiler under test, assembles and links it, runs the program and compares
//! exit codes.

pub mod annotation;
pub mod assembler;
pub mod compiler;
pub mod corpus;
pub mod harness;
pub mod report;
pub mod verify;

pub use annotation::{expected_return_value, AnnotationError, Expected, RETURN_COMMENT_PREFIX};
pub use assembler::Assembler;
pub use compiler::Compiler;
pub use corpus::scan_corpus;
pub use harness::{Harness, HarnessConfig, RunSummary};
pub use verify::TestOutcome;
