//! Connector configuration
//!
//! Selects a backend and its construction parameters from serialized
//! configuration:
//!
//! ```rust
//! use hydrostore::{Connector, ConnectorConfig};
//!
//! let config = ConnectorConfig::from_json(r#"{"type": "memory", "name": "scratch"}"#)?;
//! let conn = config.connect()?;
//! assert_eq!(conn.name(), "scratch");
//! # Ok::<(), hydrostore::Error>(())
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::connector::{
    AnyConnector, DocumentConnector, MemoryConnector, ParquetConnector, PasConnector,
};
use crate::diagnostics::Diagnostics;
use crate::{Error, Result};

/// Backend selection plus construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectorConfig {
    /// In-memory libraries
    Memory {
        /// Project name
        name: String,
    },
    /// `.pas` files below `path`
    Pas {
        /// Project name
        name: String,
        /// Root directory
        path: PathBuf,
    },
    /// SQLite tables
    Document {
        /// Project name
        name: String,
        /// Database path, `:memory:` or `file:` URI
        connstr: String,
    },
    /// Parquet files below `path/name`
    Parquet {
        /// Project name
        name: String,
        /// Root directory
        path: PathBuf,
    },
}

impl ConnectorConfig {
    /// Parse a JSON configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] on malformed or unknown configuration
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("invalid connector config: {e}")))
    }

    /// Project name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Memory { name }
            | Self::Pas { name, .. }
            | Self::Document { name, .. }
            | Self::Parquet { name, .. } => name,
        }
    }

    /// Build the configured connector.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if the backend cannot be reached
    pub fn connect(&self) -> Result<AnyConnector> {
        self.connect_with(Diagnostics::new())
    }

    /// Build the configured connector reporting to `diagnostics`.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if the backend cannot be reached
    pub fn connect_with(&self, diagnostics: Diagnostics) -> Result<AnyConnector> {
        tracing::debug!(config = ?self, "connecting");
        Ok(match self {
            Self::Memory { name } => {
                MemoryConnector::with_diagnostics(name.clone(), diagnostics).into()
            }
            Self::Pas { name, path } => {
                PasConnector::with_diagnostics(name.clone(), path, diagnostics)?.into()
            }
            Self::Document { name, connstr } => {
                DocumentConnector::with_diagnostics(name.clone(), connstr.clone(), diagnostics)?
                    .into()
            }
            Self::Parquet { name, path } => {
                ParquetConnector::with_diagnostics(name.clone(), path, diagnostics)?.into()
            }
        })
    }
}
