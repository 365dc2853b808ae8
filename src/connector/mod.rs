//! Connector contract
//!
//! A [`Connector`] persists oseries, stresses and models in one storage
//! backend. Four interchangeable implementations exist:
//!
//! | connector              | backend                         | location             |
//! |------------------------|---------------------------------|----------------------|
//! | [`MemoryConnector`]    | process-local maps              | none                 |
//! | [`PasConnector`]       | `.pas` JSON files               | directory            |
//! | [`DocumentConnector`]  | SQLite documents                | connection string    |
//! | [`ParquetConnector`]   | Arrow/Parquet files             | directory            |
//!
//! Backends implement a handful of hooks (`store_item`, `load_item`,
//! `remove_item`, `load_metadata`, `list_names`). The uniform operations
//! callers use (`add_item`, `get_item`, `delete_item`, `get_metadata`, and
//! the typed helpers) are provided by the trait, so overwrite policy, item
//! kind checks and name validation are identical everywhere.
//!
//! # Example
//!
//! ```rust
//! use hydrostore::{Connector, Library, MemoryConnector, Metadata, TimeSeries};
//! use chrono::NaiveDate;
//!
//! let mut conn = MemoryConnector::new("my_project");
//! let t0 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let head = TimeSeries::from_pairs([(t0, 1.0), (t0 + chrono::Duration::hours(1), 2.0)]);
//! let meta = Metadata::new().with("x", 100.0).with("y", 200.0);
//!
//! conn.add_oseries(&head, "well_A", Some(&meta), false)?;
//! assert_eq!(conn.get_oseries("well_A")?, head);
//! assert_eq!(conn.oseries_names()?, vec!["well_A".to_string()]);
//!
//! conn.del_oseries("well_A")?;
//! assert!(conn.get_oseries("well_A").unwrap_err().is_not_found());
//! # Ok::<(), hydrostore::Error>(())
//! ```

mod document;
mod memory;
mod parquet;
mod pas;

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

pub use document::DocumentConnector;
pub use memory::MemoryConnector;
pub use parquet::ParquetConnector;
pub use pas::PasConnector;

use crate::codec::ORIGIN_SHAPE_KEY;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::library::Library;
use crate::metadata::Metadata;
use crate::model::ModelRecord;
use crate::series::TimeSeries;
use crate::util::check_item_name;
use crate::{Error, Result};

/// Stored item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Time series (oseries and stresses libraries)
    Series(TimeSeries),
    /// Model record (models library)
    Model(ModelRecord),
}

impl Item {
    /// Borrowed view
    #[must_use]
    pub const fn as_item_ref(&self) -> ItemRef<'_> {
        match self {
            Self::Series(s) => ItemRef::Series(s),
            Self::Model(m) => ItemRef::Model(m),
        }
    }

    /// Unwrap a series.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for a model
    pub fn into_series(self) -> Result<TimeSeries> {
        match self {
            Self::Series(s) => Ok(s),
            Self::Model(m) => Err(Error::InvalidInput(format!(
                "item '{}' is a model, not a series",
                m.name()
            ))),
        }
    }

    /// Unwrap a model.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for a series
    pub fn into_model(self) -> Result<ModelRecord> {
        match self {
            Self::Model(m) => Ok(m),
            Self::Series(_) => Err(Error::InvalidInput(
                "item is a series, not a model".to_string(),
            )),
        }
    }
}

impl From<TimeSeries> for Item {
    fn from(s: TimeSeries) -> Self {
        Self::Series(s)
    }
}

impl From<ModelRecord> for Item {
    fn from(m: ModelRecord) -> Self {
        Self::Model(m)
    }
}

/// Borrowed item handed to [`Connector::add_item`].
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    /// Time series
    Series(&'a TimeSeries),
    /// Model record
    Model(&'a ModelRecord),
}

impl ItemRef<'_> {
    /// Owned copy
    #[must_use]
    pub fn to_item(&self) -> Item {
        match *self {
            Self::Series(s) => Item::Series(s.clone()),
            Self::Model(m) => Item::Model(m.clone()),
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Series(_) => "series",
            Self::Model(_) => "model",
        }
    }
}

impl<'a> From<&'a TimeSeries> for ItemRef<'a> {
    fn from(s: &'a TimeSeries) -> Self {
        Self::Series(s)
    }
}

impl<'a> From<&'a ModelRecord> for ItemRef<'a> {
    fn from(m: &'a ModelRecord) -> Self {
        Self::Model(m)
    }
}

impl<'a> From<&'a Item> for ItemRef<'a> {
    fn from(item: &'a Item) -> Self {
        item.as_item_ref()
    }
}

/// Backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorType {
    /// [`MemoryConnector`]
    Memory,
    /// [`PasConnector`]
    Pas,
    /// [`DocumentConnector`]
    Document,
    /// [`ParquetConnector`]
    Parquet,
}

impl ConnectorType {
    /// Short name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Pas => "pas",
            Self::Document => "document",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistence contract shared by every backend.
///
/// Mutating operations take `&mut self`; the connector holds no locks, so
/// callers sharing one connector serialize their own access.
pub trait Connector {
    /// Project name
    fn name(&self) -> &str;

    /// Backend kind
    fn conn_type(&self) -> ConnectorType;

    /// Diagnostics injected at construction
    fn diagnostics(&self) -> &Diagnostics;

    /// Whether the library's backing storage is present
    fn library_exists(&self, library: Library) -> bool;

    /// Names of every item in a library.
    ///
    /// # Errors
    /// Returns backend errors
    fn list_names(&self, library: Library) -> Result<Vec<String>>;

    /// Backend hook: persist a validated item. Series always arrive with an
    /// envelope carrying `origin_shape`; models never carry one.
    ///
    /// # Errors
    /// Returns backend or serialization errors
    fn store_item(
        &mut self,
        library: Library,
        item: ItemRef<'_>,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<()>;

    /// Backend hook: read an item.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn load_item(&self, library: Library, name: &str) -> Result<Item>;

    /// Backend hook: remove an item and its envelope.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn remove_item(&mut self, library: Library, name: &str) -> Result<()>;

    /// Backend hook: read the envelope of a series.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the item is absent
    fn load_metadata(&self, library: Library, name: &str) -> Result<Metadata>;

    /// Remove the backend storage of some or all libraries, ending the
    /// connector's lifetime.
    ///
    /// # Errors
    /// Returns backend errors
    fn delete_libraries(self, libraries: Option<&[Library]>) -> Result<()>
    where
        Self: Sized;

    /// Whether an item exists.
    ///
    /// # Errors
    /// Returns backend errors
    fn item_exists(&self, library: Library, name: &str) -> Result<bool> {
        Ok(self.list_names(library)?.iter().any(|n| n == name))
    }

    /// Store `item` under `name`.
    ///
    /// Series are only accepted in `oseries`/`stresses`, models only in
    /// `models`. An existing item is replaced when `overwrite` is set and
    /// rejected with [`Error::AlreadyExists`] otherwise. Metadata passed for
    /// a model is ignored.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`], [`Error::AlreadyExists`],
    /// [`Error::Serialization`] for series with repeated timestamps or models
    /// with a repeated mapping key, or backend errors
    fn add_item(
        &mut self,
        library: Library,
        item: ItemRef<'_>,
        name: &str,
        metadata: Option<&Metadata>,
        overwrite: bool,
    ) -> Result<()> {
        check_item_name(library, name)?;
        let envelope = match (library.holds_series(), item) {
            (true, ItemRef::Series(series)) => {
                if !series.has_unique_index() {
                    return Err(Error::Serialization(format!(
                        "series '{name}' has duplicate timestamps"
                    )));
                }
                let mut envelope = metadata.cloned().unwrap_or_default();
                if envelope.get(ORIGIN_SHAPE_KEY).is_some() {
                    return Err(Error::InvalidInput(format!(
                        "metadata key '{ORIGIN_SHAPE_KEY}' is reserved"
                    )));
                }
                envelope.set_origin_shape(Some(series.shape()));
                Some(envelope)
            }
            (false, ItemRef::Model(model)) => {
                if let Some(key) = model.duplicate_key() {
                    return Err(Error::Serialization(format!(
                        "model '{name}' has duplicate key '{key}'"
                    )));
                }
                if metadata.is_some() {
                    self.diagnostics().emit(Diagnostic::MetadataIgnored {
                        name: name.to_string(),
                    });
                }
                None
            }
            (_, item) => {
                return Err(Error::InvalidInput(format!(
                    "cannot store a {} in the '{library}' library",
                    item.kind()
                )))
            }
        };

        if self.item_exists(library, name)? {
            if !overwrite {
                return Err(Error::already_exists(library, name));
            }
            self.diagnostics().emit(Diagnostic::ItemOverwritten {
                library,
                name: name.to_string(),
            });
        }

        tracing::debug!(connector = self.name(), %library, name, "add item");
        self.store_item(library, item, name, envelope.as_ref())
    }

    /// Retrieve an item.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn get_item(&self, library: Library, name: &str) -> Result<Item> {
        tracing::debug!(connector = self.name(), %library, name, "get item");
        self.load_item(library, name)
    }

    /// Delete an item and its metadata.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn delete_item(&mut self, library: Library, name: &str) -> Result<()> {
        tracing::debug!(connector = self.name(), %library, name, "delete item");
        self.remove_item(library, name)
    }

    /// Metadata of a series, without bookkeeping values.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for the models library and
    /// [`Error::NotFound`] if the item is absent
    fn get_metadata(&self, library: Library, name: &str) -> Result<Metadata> {
        if !library.holds_series() {
            return Err(Error::InvalidInput(
                "models carry no metadata envelope".to_string(),
            ));
        }
        let mut metadata = self.load_metadata(library, name)?;
        metadata.set_origin_shape(None);
        Ok(metadata)
    }

    /// Number of items in a library.
    ///
    /// # Errors
    /// Returns backend errors
    fn n_items(&self, library: Library) -> Result<usize> {
        Ok(self.list_names(library)?.len())
    }

    /// Delete every item of a library, returning how many were removed.
    ///
    /// # Errors
    /// Returns backend errors
    fn empty_library(&mut self, library: Library) -> Result<usize> {
        let names = self.list_names(library)?;
        for name in &names {
            self.delete_item(library, name)?;
        }
        tracing::info!(connector = self.name(), %library, removed = names.len(), "emptied library");
        Ok(names.len())
    }

    /// Names of all oseries.
    ///
    /// # Errors
    /// Returns backend errors
    fn oseries_names(&self) -> Result<Vec<String>> {
        self.list_names(Library::Oseries)
    }

    /// Names of all stresses.
    ///
    /// # Errors
    /// Returns backend errors
    fn stresses_names(&self) -> Result<Vec<String>> {
        self.list_names(Library::Stresses)
    }

    /// Names of all models.
    ///
    /// # Errors
    /// Returns backend errors
    fn model_names(&self) -> Result<Vec<String>> {
        self.list_names(Library::Models)
    }

    /// Add an observation series.
    ///
    /// # Errors
    /// See [`Connector::add_item`]
    fn add_oseries(
        &mut self,
        series: &TimeSeries,
        name: &str,
        metadata: Option<&Metadata>,
        overwrite: bool,
    ) -> Result<()> {
        self.add_item(Library::Oseries, series.into(), name, metadata, overwrite)
    }

    /// Add a stress series, recording its `kind` (prec, evap, well, ...) in the envelope.
    ///
    /// # Errors
    /// See [`Connector::add_item`]
    fn add_stress(
        &mut self,
        series: &TimeSeries,
        name: &str,
        kind: Option<&str>,
        metadata: Option<&Metadata>,
        overwrite: bool,
    ) -> Result<()> {
        match kind {
            Some(kind) => {
                let envelope = metadata.cloned().unwrap_or_default().with("kind", kind);
                self.add_item(Library::Stresses, series.into(), name, Some(&envelope), overwrite)
            }
            None => self.add_item(Library::Stresses, series.into(), name, metadata, overwrite),
        }
    }

    /// Add a model under its own name.
    ///
    /// # Errors
    /// See [`Connector::add_item`]
    fn add_model(&mut self, model: &ModelRecord, overwrite: bool) -> Result<()> {
        self.add_item(Library::Models, model.into(), model.name(), None, overwrite)
    }

    /// Retrieve an observation series.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn get_oseries(&self, name: &str) -> Result<TimeSeries> {
        self.get_item(Library::Oseries, name)?.into_series()
    }

    /// Retrieve a stress series.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn get_stress(&self, name: &str) -> Result<TimeSeries> {
        self.get_item(Library::Stresses, name)?.into_series()
    }

    /// Retrieve a model.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn get_model(&self, name: &str) -> Result<ModelRecord> {
        self.get_item(Library::Models, name)?.into_model()
    }

    /// Metadata of an observation series.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn get_oseries_metadata(&self, name: &str) -> Result<Metadata> {
        self.get_metadata(Library::Oseries, name)
    }

    /// Metadata of a stress series.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn get_stress_metadata(&self, name: &str) -> Result<Metadata> {
        self.get_metadata(Library::Stresses, name)
    }

    /// Delete an observation series.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn del_oseries(&mut self, name: &str) -> Result<()> {
        self.delete_item(Library::Oseries, name)
    }

    /// Delete a stress series.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn del_stress(&mut self, name: &str) -> Result<()> {
        self.delete_item(Library::Stresses, name)
    }

    /// Delete a model.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if absent
    fn del_model(&mut self, name: &str) -> Result<()> {
        self.delete_item(Library::Models, name)
    }
}

/// Any of the four connectors, chosen at runtime (e.g. from configuration).
#[derive(Debug)]
pub enum AnyConnector {
    /// In-memory backend
    Memory(MemoryConnector),
    /// Flat-file backend
    Pas(PasConnector),
    /// Document backend
    Document(DocumentConnector),
    /// Columnar backend
    Parquet(ParquetConnector),
}

macro_rules! dispatch {
    ($self:expr, $conn:ident => $body:expr) => {
        match $self {
            AnyConnector::Memory($conn) => $body,
            AnyConnector::Pas($conn) => $body,
            AnyConnector::Document($conn) => $body,
            AnyConnector::Parquet($conn) => $body,
        }
    };
}

impl Connector for AnyConnector {
    fn name(&self) -> &str {
        dispatch!(self, c => c.name())
    }

    fn conn_type(&self) -> ConnectorType {
        dispatch!(self, c => c.conn_type())
    }

    fn diagnostics(&self) -> &Diagnostics {
        dispatch!(self, c => c.diagnostics())
    }

    fn library_exists(&self, library: Library) -> bool {
        dispatch!(self, c => c.library_exists(library))
    }

    fn list_names(&self, library: Library) -> Result<Vec<String>> {
        dispatch!(self, c => c.list_names(library))
    }

    fn store_item(
        &mut self,
        library: Library,
        item: ItemRef<'_>,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<()> {
        dispatch!(self, c => c.store_item(library, item, name, metadata))
    }

    fn load_item(&self, library: Library, name: &str) -> Result<Item> {
        dispatch!(self, c => c.load_item(library, name))
    }

    fn remove_item(&mut self, library: Library, name: &str) -> Result<()> {
        dispatch!(self, c => c.remove_item(library, name))
    }

    fn load_metadata(&self, library: Library, name: &str) -> Result<Metadata> {
        dispatch!(self, c => c.load_metadata(library, name))
    }

    fn delete_libraries(self, libraries: Option<&[Library]>) -> Result<()> {
        dispatch!(self, c => c.delete_libraries(libraries))
    }

    fn item_exists(&self, library: Library, name: &str) -> Result<bool> {
        dispatch!(self, c => c.item_exists(library, name))
    }
}

impl From<MemoryConnector> for AnyConnector {
    fn from(c: MemoryConnector) -> Self {
        Self::Memory(c)
    }
}

impl From<PasConnector> for AnyConnector {
    fn from(c: PasConnector) -> Self {
        Self::Pas(c)
    }
}

impl From<DocumentConnector> for AnyConnector {
    fn from(c: DocumentConnector) -> Self {
        Self::Document(c)
    }
}

impl From<ParquetConnector> for AnyConnector {
    fn from(c: ParquetConnector) -> Self {
        Self::Parquet(c)
    }
}

// Shared helpers for the on-disk backends.

/// Read a file, mapping a missing file to [`Error::NotFound`].
fn read_item_file(path: &Path, library: Library, name: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::not_found(library, name),
        _ => Error::Io(e),
    })
}

/// Read an optional file.
fn read_optional_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Write through a temporary sibling and rename into place.
fn write_file_atomic(path: &Path, write: impl FnOnce(fs::File) -> Result<()>) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    let result = fs::File::create(&tmp)
        .map_err(Error::from)
        .and_then(write)
        .and_then(|()| fs::rename(&tmp, path).map_err(Error::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Create a library directory if missing, reporting whether it was created or linked.
fn init_library_dir(
    dir: &Path,
    connector: &str,
    library: Library,
    diagnostics: &Diagnostics,
) -> Result<()> {
    let location = format!("directory: {}", dir.display());
    if dir.is_dir() {
        diagnostics.emit(Diagnostic::LibraryLinked {
            connector: connector.to_string(),
            library,
            location,
        });
    } else {
        fs::create_dir_all(dir).map_err(|e| {
            Error::BackendUnavailable(format!("cannot create {}: {e}", dir.display()))
        })?;
        diagnostics.emit(Diagnostic::LibraryCreated {
            connector: connector.to_string(),
            library,
            location,
        });
    }
    Ok(())
}

/// Absolute form of a user-supplied root directory.
fn absolute_root(path: &Path) -> Result<std::path::PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::BackendUnavailable(format!("cannot resolve {}: {e}", path.display())))?;
        Ok(cwd.join(path))
    }
}
