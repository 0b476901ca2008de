//! Error types for docdex operations.
//!
//! Every failure kind a caller can observe is a distinct variant, and the
//! retry classification is fixed at the variant itself rather than inferred
//! from message content downstream.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocdexError>;

/// Whether the retry executor may re-attempt an operation that failed
/// with a given error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Transient failure; another attempt may succeed.
    Retriable,
    /// Deterministic failure; retrying can never succeed.
    NonRetriable,
}

/// The main error type for docdex operations.
#[derive(Debug, Error)]
pub enum DocdexError {
    /// A task was created with an identifier that already exists.
    #[error("task already exists: {id}")]
    DuplicateTask {
        /// The conflicting task identifier.
        id: String,
    },

    /// A mutation referenced a task identifier that was never created.
    #[error("unknown task: {id}")]
    UnknownTask {
        /// The missing task identifier.
        id: String,
    },

    /// Cancellation was observed for the task driving an operation.
    #[error("operation cancelled for task {id}")]
    Cancelled {
        /// The cancelled task identifier.
        id: String,
    },

    /// Caller-supplied parameters failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A vector store request failed transiently.
    #[error("vector store request failed: {0}")]
    VectorStore(String),

    /// An embedding request failed transiently.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// A page fetch failed transiently.
    #[error("page fetch failed: {0}")]
    Crawl(String),

    /// Payload serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An error from an external collaborator with no dedicated variant.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocdexError {
    /// Creates a duplicate task error.
    #[must_use]
    pub fn duplicate_task(id: impl Into<String>) -> Self {
        Self::DuplicateTask { id: id.into() }
    }

    /// Creates an unknown task error.
    #[must_use]
    pub fn unknown_task(id: impl Into<String>) -> Self {
        Self::UnknownTask { id: id.into() }
    }

    /// Creates a cancellation error for a task.
    #[must_use]
    pub fn cancelled(id: impl Into<String>) -> Self {
        Self::Cancelled { id: id.into() }
    }

    /// Creates an invalid parameters error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    /// Creates a transient vector store error.
    #[must_use]
    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::VectorStore(message.into())
    }

    /// Creates a transient embedding error.
    #[must_use]
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Creates a transient crawl error.
    #[must_use]
    pub fn crawl(message: impl Into<String>) -> Self {
        Self::Crawl(message.into())
    }

    /// Returns true if this error represents an observed cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the retry classification assigned at this error's origin.
    ///
    /// Remote-call failures are transient by construction; everything else
    /// is deterministic and must surface to the caller unchanged.
    #[must_use]
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::VectorStore(_) | Self::Embedding(_) | Self::Crawl(_) => RetryClass::Retriable,
            Self::DuplicateTask { .. }
            | Self::UnknownTask { .. }
            | Self::Cancelled { .. }
            | Self::InvalidParams(_)
            | Self::Serialization(_)
            | Self::Other(_) => RetryClass::NonRetriable,
        }
    }
}

impl From<serde_json::Error> for DocdexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
