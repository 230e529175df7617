use thiserror::Error;

/// Fatal problems with the container itself. The parse stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("missing signature")]
    MissingSignature,

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("empty")]
    Empty,
}

impl FormatError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        FormatError::MalformedHeader(detail.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Every record was skipped, or none were declared.
    #[error("no valid {what} found")]
    EmptyResult { what: &'static str },

    /// A checkpoint callback asked the parse to stop.
    #[error("parse cancelled after {processed} units")]
    Cancelled { processed: usize },
}
