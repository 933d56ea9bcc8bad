use std::fmt;
use std::num::IntErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Every fixture declares its expected exit code on a line starting with this.
pub const RETURN_COMMENT_PREFIX: &str = "// Returns:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    Missing,
    InvalidInteger { line: usize, text: String },
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationError::Missing => {
                write!(f, "no \"{RETURN_COMMENT_PREFIX}\" comment")
            }
            AnnotationError::InvalidInteger { line, text } => write!(
                f,
                "line {line}: expected a base-10 integer after \"{RETURN_COMMENT_PREFIX}\", got {text:?}"
            ),
        }
    }
}

impl std::error::Error for AnnotationError {}

/// A declared exit code.
///
/// Integers beyond `i64` keep their canonical decimal text; no exit status
/// can equal them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Expected {
    Value(i64),
    Unrepresentable(String),
}

impl Expected {
    pub fn matches(&self, exit_status: i32) -> bool {
        match self {
            Expected::Value(v) => *v == i64::from(exit_status),
            Expected::Unrepresentable(_) => false,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Value(v) => write!(f, "{v}"),
            Expected::Unrepresentable(digits) => f.write_str(digits),
        }
    }
}

/// The value declared by the first `// Returns:` line of `source`.
///
/// Later annotations are ignored. The value is not checked against the
/// 0..=255 exit status range, so a fixture declaring `300` parses fine and
/// simply never passes.
pub fn expected_return_value(source: &str) -> Result<Expected, AnnotationError> {
    let (idx, rest) = source
        .lines()
        .enumerate()
        .find_map(|(idx, line)| {
            line.strip_prefix(RETURN_COMMENT_PREFIX)
                .map(|rest| (idx, rest))
        })
        .ok_or(AnnotationError::Missing)?;

    let text = rest.trim();
    match text.parse::<i64>() {
        Ok(v) => Ok(Expected::Value(v)),
        Err(err) if matches!(err.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Ok(Expected::Unrepresentable(canonical_digits(text)))
        }
        Err(_) => Err(AnnotationError::InvalidInteger {
            line: idx + 1,
            text: text.to_string(),
        }),
    }
}

/// `+007` -> `7`, `-0012` -> `-12`. Only called on text `i64` parsing
/// rejected as overflow, so it is a sign followed by digits.
fn canonical_digits(text: &str) -> String {
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => ("-", &text[1..]),
        Some(b'+') => ("", &text[1..]),
        _ => ("", text),
    };
    format!("{sign}{}", digits.trim_start_matches('0'))
}

pub fn read_expected_return_value(fixture: &Path) -> Result<Expected> {
    let bytes = std::fs::read(fixture)
        .with_context(|| format!("read fixture: {}", fixture.display()))?;
    let source = String::from_utf8_lossy(&bytes);
    expected_return_value(&source)
        .with_context(|| format!("malformed fixture: {}", fixture.display()))
}
