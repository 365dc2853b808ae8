//! In-memory connector.
//!
//! Items live in process memory only and are lost when the connector is
//! dropped. Items and envelopes are cloned on the way in and out, so stored
//! values never alias values held by the caller.

use std::collections::HashMap;

use super::{Connector, ConnectorType, Item, ItemRef};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::library::{Library, LibraryHandles};
use crate::metadata::Metadata;
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct Entry {
    item: Item,
    metadata: Option<Metadata>,
}

/// One library: entries by name plus insertion order for listing.
#[derive(Debug, Clone, Default)]
struct MemoryLibrary {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl MemoryLibrary {
    fn insert(&mut self, name: &str, entry: Entry) {
        if self.entries.insert(name.to_string(), entry).is_none() {
            self.order.push(name.to_string());
        }
    }

    fn remove(&mut self, name: &str) -> Option<Entry> {
        let entry = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        Some(entry)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Connector keeping every library in a map.
///
/// # Example
///
/// ```rust
/// use hydrostore::{Connector, MemoryConnector, ModelRecord};
///
/// let mut conn = MemoryConnector::new("scratch");
/// conn.add_model(&ModelRecord::new("ml_A"), false)?;
/// assert_eq!(conn.model_names()?, vec!["ml_A".to_string()]);
/// # Ok::<(), hydrostore::Error>(())
/// ```
#[derive(Debug)]
pub struct MemoryConnector {
    name: String,
    libraries: LibraryHandles<MemoryLibrary>,
    diagnostics: Diagnostics,
}

impl MemoryConnector {
    /// Create an empty connector.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_diagnostics(name, Diagnostics::new())
    }

    /// Create an empty connector reporting to `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(name: impl Into<String>, diagnostics: Diagnostics) -> Self {
        let name = name.into();
        for library in Library::ALL {
            diagnostics.emit(Diagnostic::LibraryCreated {
                connector: name.clone(),
                library,
                location: "memory".to_string(),
            });
        }
        Self {
            name,
            libraries: LibraryHandles::default(),
            diagnostics,
        }
    }

    fn library(&self, library: Library) -> &MemoryLibrary {
        self.libraries.get(library)
    }

    fn entry(&self, library: Library, name: &str) -> Result<&Entry> {
        self.library(library)
            .entries
            .get(name)
            .ok_or_else(|| Error::not_found(library, name))
    }
}

impl Connector for MemoryConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn conn_type(&self) -> ConnectorType {
        ConnectorType::Memory
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn library_exists(&self, _library: Library) -> bool {
        true
    }

    fn list_names(&self, library: Library) -> Result<Vec<String>> {
        Ok(self.library(library).order.clone())
    }

    fn item_exists(&self, library: Library, name: &str) -> Result<bool> {
        Ok(self.library(library).entries.contains_key(name))
    }

    fn store_item(
        &mut self,
        library: Library,
        item: ItemRef<'_>,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<()> {
        let entry = Entry {
            item: item.to_item(),
            metadata: metadata.cloned(),
        };
        self.libraries.get_mut(library).insert(name, entry);
        Ok(())
    }

    fn load_item(&self, library: Library, name: &str) -> Result<Item> {
        Ok(self.entry(library, name)?.item.clone())
    }

    fn remove_item(&mut self, library: Library, name: &str) -> Result<()> {
        self.libraries
            .get_mut(library)
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(library, name))
    }

    fn load_metadata(&self, library: Library, name: &str) -> Result<Metadata> {
        Ok(self
            .entry(library, name)?
            .metadata
            .clone()
            .unwrap_or_default())
    }

    fn delete_libraries(mut self, libraries: Option<&[Library]>) -> Result<()> {
        let libraries = libraries.unwrap_or(&Library::ALL);
        for &library in libraries {
            self.libraries.get_mut(library).clear();
        }
        self.diagnostics.emit(Diagnostic::StorageDeleted {
            connector: self.name.clone(),
            libraries: libraries.to_vec(),
        });
        Ok(())
    }
}
