use thiserror::Error;

/// Structural errors raised by the post and project parsers.
///
/// Field-level problems (missing title, bad URL, ...) are not parse errors;
/// they are reported by the validator as violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    #[error("unexpected field(s): {}", .0.join(", "))]
    UnexpectedField(Vec<String>),
}

impl ParseError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        ParseError::MalformedStructure(detail.into())
    }
}
