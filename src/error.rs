//! Error types for hydrostore
//!
//! Every failure is surfaced synchronously to the caller. Nothing is retried.

use thiserror::Error;

use crate::library::Library;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// hydrostore error types
#[derive(Error, Debug)]
pub enum Error {
    /// Requested item is absent from the library
    #[error("Item '{name}' not in '{library}' library")]
    NotFound {
        /// Library that was searched
        library: Library,
        /// Name of the missing item
        name: String,
    },

    /// Item exists and overwrite was not requested
    #[error("Item '{name}' already in '{library}' library\nPass overwrite=true to replace it")]
    AlreadyExists {
        /// Library holding the item
        library: Library,
        /// Name of the existing item
        name: String,
    },

    /// Backend could not be reached or initialized (fatal to the connector)
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Caller passed something the contract does not accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`]
    pub fn not_found(library: Library, name: impl Into<String>) -> Self {
        Self::NotFound {
            library,
            name: name.into(),
        }
    }

    /// Shorthand for [`Error::AlreadyExists`]
    pub fn already_exists(library: Library, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            library,
            name: name.into(),
        }
    }

    /// True for [`Error::NotFound`]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
