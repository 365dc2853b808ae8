//! # hydrostore: Persistent Storage for Groundwater Time Series Models
//!
//! **Version**: 0.1.0
//!
//! hydrostore keeps observation series (`oseries`), stress series
//! (`stresses`) and fitted model records (`models`) in one of four
//! interchangeable storage backends behind a single [`Connector`] trait.
//!
//! ## Backends
//!
//! - **Memory**: [`MemoryConnector`], process-local, nothing persisted
//! - **Flat files**: [`PasConnector`], one `.pas` JSON file per item
//! - **Document store**: [`DocumentConnector`], JSON documents in SQLite tables
//! - **Columnar**: [`ParquetConnector`], Arrow/Parquet file per item
//!
//! Every backend stores the same logical data and returns identical items:
//! a bare series comes back as a bare series, a frame as a frame, NaN as
//! NaN, and model records with their key order intact.
//!
//! ## Example Usage
//!
//! ```rust
//! use hydrostore::{Connector, ConnectorConfig, Metadata, TimeSeries};
//! use chrono::NaiveDate;
//!
//! let dir = tempfile::tempdir()?;
//! let config = ConnectorConfig::Pas {
//!     name: "my_project".to_string(),
//!     path: dir.path().to_path_buf(),
//! };
//! let mut conn = config.connect()?;
//!
//! let t0 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let head = TimeSeries::from_pairs([(t0, 1.0), (t0 + chrono::Duration::hours(1), f64::NAN)]);
//! conn.add_oseries(&head, "well_A", Some(&Metadata::new().with("x", 100.0)), false)?;
//!
//! assert_eq!(conn.get_oseries("well_A")?, head);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod codec;
pub mod config;
pub mod connector;
pub mod diagnostics;
pub mod error;
pub mod library;
pub mod metadata;
pub mod model;
pub mod series;
pub mod util;

pub use config::ConnectorConfig;
pub use connector::{
    AnyConnector, Connector, ConnectorType, DocumentConnector, Item, ItemRef, MemoryConnector,
    ParquetConnector, PasConnector,
};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics};
pub use error::{Error, Result};
pub use library::Library;
pub use metadata::{MetaValue, Metadata};
pub use model::{ModelRecord, ModelValue, Parameter, ParameterTable};
pub use series::{Shape, TimeSeries};
