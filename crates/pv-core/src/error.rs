//! Unified error type for picvault.
//!
//! All crates funnel their failures into [`Error`]. The variants separate
//! caller-fixable problems ([`Error::InvalidInput`], [`Error::NotFound`]) from
//! operator-level ones ([`Error::StorageInconsistency`],
//! [`Error::BackendUnavailable`]), and [`Error::http_status`] lets the HTTP
//! layer derive a status code without knowing the variants.

use std::fmt;

/// Unified error type covering all failure modes in picvault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request data failed validation (empty payload, empty filename,
    /// missing session in session mode, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "picture", "blob").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A metadata row references a blob that does not exist.
    #[error("Storage inconsistency: picture {id} references missing blob {blob_key}")]
    StorageInconsistency {
        /// Identity of the offending row.
        id: String,
        /// The blob key the row points at.
        blob_key: String,
    },

    /// The blob store or the metadata index failed or could not be reached.
    #[error("Backend unavailable [{operation} {key}]: {source}")]
    BackendUnavailable {
        /// The store operation that failed (e.g. "blob.write").
        operation: String,
        /// The key or id the operation addressed.
        key: String,
        /// The underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A database setup operation (pool, migrations) failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::NotFound { .. } => 404,
            Error::StorageInconsistency { .. } => 500,
            Error::BackendUnavailable { .. } => 503,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether the caller can fix this error by changing the request.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::NotFound { .. })
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Convenience constructor for [`Error::StorageInconsistency`].
    pub fn inconsistency(id: impl fmt::Display, blob_key: impl Into<String>) -> Self {
        Error::StorageInconsistency {
            id: id.to_string(),
            blob_key: blob_key.into(),
        }
    }

    /// Convenience constructor for [`Error::BackendUnavailable`].
    pub fn backend(
        operation: impl Into<String>,
        key: impl fmt::Display,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::BackendUnavailable {
            operation: operation.into(),
            key: key.to_string(),
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
