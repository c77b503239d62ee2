use thiserror::Error;

/// Fatal errors raised while parsing a benchmark log.
///
/// Any of these aborts the whole log; records already yielded for it must be
/// discarded by the caller.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A data line arrived before the context it needs was established.
    #[error("line {line}: data line before {missing} is known: {text:?}")]
    IncompleteContext {
        line: usize,
        missing: &'static str,
        text: String,
    },

    /// A field that must hold a number (or a known category) does not.
    #[error("line {line}: invalid value {value:?} for field '{field}'")]
    InvalidFieldFormat {
        line: usize,
        field: String,
        value: String,
    },

    /// A recognized column header cannot be bound to a usable schema.
    #[error("line {line}: {reason}")]
    InvalidSchema { line: usize, reason: String },

    /// The underlying line source failed.
    #[error("line {line}: read failed: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Line the error refers to (1-based).
    pub fn line(&self) -> usize {
        match self {
            ParseError::IncompleteContext { line, .. }
            | ParseError::InvalidFieldFormat { line, .. }
            | ParseError::InvalidSchema { line, .. }
            | ParseError::Io { line, .. } => *line,
        }
    }

    pub(crate) fn invalid(line: usize, field: impl Into<String>, value: impl Into<String>) -> Self {
        ParseError::InvalidFieldFormat {
            line,
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A non-blank, non-comment line that matched no pattern and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedLine {
    pub line: usize,
    pub text: String,
}
