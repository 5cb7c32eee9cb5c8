use reframe_parser::ParseFailure;
use thiserror::Error;

/// Why a snippet could not be turned into an insertable element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsertError {
    #[error("could not find wrapper component in parsed snippet")]
    WrapperComponentNotFound,

    #[error("snippet cannot be inserted without a supporting import")]
    RequiresImport,

    #[error("snippet did not produce a valid element")]
    NotAnElement,

    #[error("snippet failed to parse: {0}")]
    Parse(String),
}

/// Top-level error for editor operations.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error("{0}")]
    Generic(String),
}
