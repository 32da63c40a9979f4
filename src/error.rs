//! Error types for the processing pipeline

use std::fmt;
use thiserror::Error;

/// Result type for core pipeline operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the staging, loading, and dispatch pipeline.
///
/// An operation reporting logical failure is not an error here: it is
/// normalized into a failed [`crate::session::ProcessResult`] at the
/// response boundary. Cleanup problems are logged warnings, never errors.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Operation name not present in the registry
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Rejected upload: bad extension, unsafe name, or nothing supplied
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Another active session already exposed this filename
    #[error("Name collision: {0}")]
    NameCollision(String),

    /// Backend could not materialize one or more staged files
    #[error("Load failure: {0}")]
    LoadFailure(String),

    /// Total upload size exceeds the configured ceiling
    #[error("Payload too large: {got} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { got: u64, limit: u64 },

    /// Could not allocate a session working directory
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// Unexpected fault from the tabular backend
    #[error("Backend fault: {0}")]
    Backend(String),

    /// Requested artifact does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create an invalid artifact error
    pub fn invalid_artifact<E: fmt::Display>(msg: E) -> Self {
        Self::InvalidArtifact(msg.to_string())
    }

    /// Create a name collision error
    pub fn name_collision<E: fmt::Display>(name: E) -> Self {
        Self::NameCollision(name.to_string())
    }

    /// Create a load failure error
    pub fn load_failure<E: fmt::Display>(msg: E) -> Self {
        Self::LoadFailure(msg.to_string())
    }

    /// Create an allocation error
    pub fn allocation<E: fmt::Display>(msg: E) -> Self {
        Self::Allocation(msg.to_string())
    }

    /// Create a backend fault
    pub fn backend<E: fmt::Display>(msg: E) -> Self {
        Self::Backend(msg.to_string())
    }

    /// Create a not found error
    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    /// True if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
