use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// A single positioned diagnostic produced while parsing.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },
}

impl ParseError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    /// Byte offset the diagnostic points at.
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { pos, .. } => *pos,
            ParseError::UnexpectedEof { pos } => *pos,
            ParseError::InvalidSyntax { pos, .. } => *pos,
        }
    }
}

/// The failure channel of a parse: one message per diagnosable problem.
///
/// Malformed user code is an expected input, so this is always returned as
/// a value and never thrown past the parser boundary.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("parse failed: {}", self.joined_messages())]
pub struct ParseFailure {
    pub errors: Vec<ParseError>,
}

impl ParseFailure {
    pub fn new(errors: Vec<ParseError>) -> Self {
        Self { errors }
    }

    pub fn joined_messages(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
