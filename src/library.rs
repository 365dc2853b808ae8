//! Library namespace
//!
//! Every connector partitions its storage into exactly three libraries:
//! `oseries`, `stresses` and `models`. Libraries are disjoint namespaces, so
//! the same item name may exist in `oseries` and `stresses` independently.
//!
//! Backends keep one handle per library (a directory, a table name, a map)
//! in a [`LibraryHandles`], created or linked once at construction time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One of the three libraries of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    /// Observation time series
    Oseries,
    /// Stress (forcing) time series
    Stresses,
    /// Fitted model records
    Models,
}

impl Library {
    /// All libraries, in initialization order.
    pub const ALL: [Self; 3] = [Self::Oseries, Self::Stresses, Self::Models];

    /// Library name as used on disk and in table names
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Oseries => "oseries",
            Self::Stresses => "stresses",
            Self::Models => "models",
        }
    }

    /// True for the two time series libraries
    #[must_use]
    pub const fn holds_series(&self) -> bool {
        matches!(self, Self::Oseries | Self::Stresses)
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Library {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oseries" => Ok(Self::Oseries),
            "stresses" => Ok(Self::Stresses),
            "models" => Ok(Self::Models),
            other => Err(Error::InvalidInput(format!(
                "unknown library '{other}', expected one of oseries, stresses, models"
            ))),
        }
    }
}

/// One backend handle per library.
#[derive(Debug, Clone, Default)]
pub struct LibraryHandles<T> {
    oseries: T,
    stresses: T,
    models: T,
}

impl<T> LibraryHandles<T> {
    /// Initialize every library with a fallible constructor, in [`Library::ALL`] order.
    ///
    /// # Errors
    /// Returns the first error produced by `init`
    pub fn try_init<F>(mut init: F) -> Result<Self>
    where
        F: FnMut(Library) -> Result<T>,
    {
        Ok(Self {
            oseries: init(Library::Oseries)?,
            stresses: init(Library::Stresses)?,
            models: init(Library::Models)?,
        })
    }

    /// Handle for a library
    #[must_use]
    pub const fn get(&self, library: Library) -> &T {
        match library {
            Library::Oseries => &self.oseries,
            Library::Stresses => &self.stresses,
            Library::Models => &self.models,
        }
    }

    /// Mutable handle for a library
    pub fn get_mut(&mut self, library: Library) -> &mut T {
        match library {
            Library::Oseries => &mut self.oseries,
            Library::Stresses => &mut self.stresses,
            Library::Models => &mut self.models,
        }
    }

    /// Iterate over `(library, handle)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Library, &T)> {
        Library::ALL.into_iter().map(move |lib| (lib, self.get(lib)))
    }
}
