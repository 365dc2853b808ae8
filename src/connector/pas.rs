//! Flat-file connector.
//!
//! Layout under the root directory:
//!
//! ```text
//! <path>/oseries/<name>.pas         series payload (JSON, columns orient)
//! <path>/oseries/<name>_meta.pas    metadata envelope
//! <path>/stresses/...               same as oseries
//! <path>/models/<name>.pas          model payload
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{
    absolute_root, init_library_dir, read_item_file, read_optional_file, write_file_atomic,
    Connector, ConnectorType, Item, ItemRef,
};
use crate::codec::{decode_metadata, decode_model, decode_series, encode_metadata, encode_model, encode_series};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::library::{Library, LibraryHandles};
use crate::metadata::Metadata;
use crate::{Error, Result};

const PAYLOAD_EXT: &str = ".pas";
const SIDECAR_SUFFIX: &str = "_meta.pas";

/// Connector storing each item as a `.pas` JSON file.
#[derive(Debug)]
pub struct PasConnector {
    name: String,
    path: PathBuf,
    libraries: LibraryHandles<PathBuf>,
    diagnostics: Diagnostics,
}

impl PasConnector {
    /// Open (or create) the three library directories below `path`.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if a directory cannot be created
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        Self::with_diagnostics(name, path, Diagnostics::new())
    }

    /// Like [`PasConnector::new`], reporting to `diagnostics`.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if a directory cannot be created
    pub fn with_diagnostics(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let name = name.into();
        let path = absolute_root(path.as_ref())?;
        let libraries = LibraryHandles::try_init(|library| {
            let dir = path.join(library.as_str());
            init_library_dir(&dir, &name, library, &diagnostics)?;
            Ok(dir)
        })?;
        tracing::debug!(connector = %name, path = %path.display(), "pas connector ready");
        Ok(Self {
            name,
            path,
            libraries,
            diagnostics,
        })
    }

    /// Root directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn payload_path(&self, library: Library, name: &str) -> PathBuf {
        self.libraries.get(library).join(format!("{name}{PAYLOAD_EXT}"))
    }

    fn sidecar_path(&self, library: Library, name: &str) -> PathBuf {
        self.libraries.get(library).join(format!("{name}{SIDECAR_SUFFIX}"))
    }

    fn read_envelope(&self, library: Library, name: &str) -> Result<Metadata> {
        match read_optional_file(&self.sidecar_path(library, name))? {
            Some(text) => decode_metadata(&text),
            None => Ok(Metadata::new()),
        }
    }
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    write_file_atomic(path, |mut file| {
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        Ok(())
    })
}

impl Connector for PasConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn conn_type(&self) -> ConnectorType {
        ConnectorType::Pas
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn library_exists(&self, library: Library) -> bool {
        self.libraries.get(library).is_dir()
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn list_names(&self, library: Library) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.libraries.get(library))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if library.holds_series() && file_name.ends_with(SIDECAR_SUFFIX) {
                continue;
            }
            if let Some(name) = file_name.strip_suffix(PAYLOAD_EXT) {
                names.push(name.to_string());
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    fn item_exists(&self, library: Library, name: &str) -> Result<bool> {
        Ok(self.payload_path(library, name).is_file())
    }

    #[tracing::instrument(skip(self, item, metadata), fields(connector = %self.name))]
    fn store_item(
        &mut self,
        library: Library,
        item: ItemRef<'_>,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<()> {
        match item {
            ItemRef::Series(series) => {
                let payload = encode_series(series, name)?;
                let envelope = encode_metadata(metadata.unwrap_or(&Metadata::new()))?;
                // Sidecar first: the payload file is what makes the item exist
                write_text(&self.sidecar_path(library, name), &envelope)?;
                write_text(&self.payload_path(library, name), &payload)
            }
            ItemRef::Model(model) => {
                write_text(&self.payload_path(library, name), &encode_model(model)?)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn load_item(&self, library: Library, name: &str) -> Result<Item> {
        let payload = read_item_file(&self.payload_path(library, name), library, name)?;
        if library.holds_series() {
            let shape = self.read_envelope(library, name)?.origin_shape();
            Ok(Item::Series(decode_series(&payload, shape)?))
        } else {
            Ok(Item::Model(decode_model(&payload)?))
        }
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn remove_item(&mut self, library: Library, name: &str) -> Result<()> {
        fs::remove_file(self.payload_path(library, name)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found(library, name),
            _ => Error::Io(e),
        })?;
        if library.holds_series() {
            match fs::remove_file(self.sidecar_path(library, name)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }

    fn load_metadata(&self, library: Library, name: &str) -> Result<Metadata> {
        if !self.item_exists(library, name)? {
            return Err(Error::not_found(library, name));
        }
        self.read_envelope(library, name)
    }

    fn delete_libraries(self, libraries: Option<&[Library]>) -> Result<()> {
        match libraries {
            None => fs::remove_dir_all(&self.path)?,
            Some(libraries) => {
                for &library in libraries {
                    let dir = self.libraries.get(library);
                    if dir.is_dir() {
                        fs::remove_dir_all(dir)?;
                    }
                }
            }
        }
        self.diagnostics.emit(Diagnostic::StorageDeleted {
            connector: self.name.clone(),
            libraries: libraries.unwrap_or(&Library::ALL).to_vec(),
        });
        Ok(())
    }
}
