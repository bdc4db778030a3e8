//! Error types for the Stash engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the Stash engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Malformed calls
    #[error("{0}")]
    BadRequest(String),

    // Addressing errors
    #[error("No record found for id '{0}'")]
    NotFound(RecordId),

    #[error("Id '{0}' is already in use")]
    Conflict(RecordId),
}

/// Coarse classification of an [`Error`] for programmatic branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
}

impl Error {
    /// Build a `BadRequest` from anything displayable.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Error::BadRequest(msg.into())
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        self.kind() == ErrorKind::BadRequest
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
