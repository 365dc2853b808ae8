//! Columnar connector backed by Arrow/Parquet files.
//!
//! ```text
//! <path>/<project>/<library>/<name>/data.parquet    payload
//! <path>/<project>/<library>/<name>/metadata.json   envelope (series only)
//! ```
//!
//! Series are written as a frame (timestamp index column plus `Float64`
//! columns); the envelope's `origin_shape` restores a bare series on read.
//! Models are a one-row file with a single `Utf8` column holding their JSON.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::{
    absolute_root, init_library_dir, read_optional_file, write_file_atomic, Connector,
    ConnectorType, Item, ItemRef,
};
use crate::codec::columnar::{batches_to_model, batches_to_series, model_to_batch, series_to_batch};
use crate::codec::{decode_metadata, encode_metadata};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::library::{Library, LibraryHandles};
use crate::metadata::Metadata;
use crate::{Error, Result};

const DATA_FILE: &str = "data.parquet";
const METADATA_FILE: &str = "metadata.json";

/// Connector storing each item as a Parquet file in its own directory.
#[derive(Debug)]
pub struct ParquetConnector {
    name: String,
    root: PathBuf,
    libraries: LibraryHandles<PathBuf>,
    diagnostics: Diagnostics,
}

impl ParquetConnector {
    /// Open (or create) `<path>/<name>/{oseries,stresses,models}`.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if a directory cannot be created
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        Self::with_diagnostics(name, path, Diagnostics::new())
    }

    /// Like [`ParquetConnector::new`], reporting to `diagnostics`.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if a directory cannot be created
    pub fn with_diagnostics(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let name = name.into();
        let root = absolute_root(path.as_ref())?.join(&name);
        let libraries = LibraryHandles::try_init(|library| {
            let dir = root.join(library.as_str());
            init_library_dir(&dir, &name, library, &diagnostics)?;
            Ok(dir)
        })?;
        Ok(Self {
            name,
            root,
            libraries,
            diagnostics,
        })
    }

    /// Project directory (`<path>/<name>`)
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_dir(&self, library: Library, name: &str) -> PathBuf {
        self.libraries.get(library).join(name)
    }

    fn read_envelope(&self, library: Library, name: &str) -> Result<Metadata> {
        match read_optional_file(&self.item_dir(library, name).join(METADATA_FILE))? {
            Some(text) => decode_metadata(&text),
            None => Ok(Metadata::new()),
        }
    }

    fn read_batches(&self, library: Library, name: &str) -> Result<Vec<RecordBatch>> {
        let path = self.item_dir(library, name).join(DATA_FILE);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(library, name))
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let mut batches = builder.build()?.collect::<std::result::Result<Vec<_>, _>>()?;
        // zero-row files yield no batches; keep the column layout
        if batches.is_empty() {
            batches.push(RecordBatch::new_empty(schema));
        }
        Ok(batches)
    }
}

fn write_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    write_file_atomic(path, |file| {
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(batch)?;
        writer.close()?;
        Ok(())
    })
}

impl Connector for ParquetConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn conn_type(&self) -> ConnectorType {
        ConnectorType::Parquet
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
            if !entry.path().join(DATA_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    fn item_exists(&self, library: Library, name: &str) -> Result<bool> {
        Ok(self.item_dir(library, name).join(DATA_FILE).is_file())
    }

    #[tracing::instrument(skip(self, item, metadata), fields(connector = %self.name))]
    fn store_item(
        &mut self,
        library: Library,
        item: ItemRef<'_>,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<()> {
        let dir = self.item_dir(library, name);
        fs::create_dir_all(&dir)?;
        match item {
            ItemRef::Series(series) => {
                let batch = series_to_batch(series, name)?;
                let envelope = encode_metadata(metadata.unwrap_or(&Metadata::new()))?;
                // Envelope first: the data file is what makes the item exist
                write_file_atomic(&dir.join(METADATA_FILE), |mut file| {
                    file.write_all(envelope.as_bytes())?;
                    Ok(())
                })?;
                write_batch(&dir.join(DATA_FILE), &batch)
            }
            ItemRef::Model(model) => write_batch(&dir.join(DATA_FILE), &model_to_batch(model)?),
        }
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn load_item(&self, library: Library, name: &str) -> Result<Item> {
        let batches = self.read_batches(library, name)?;
        if library.holds_series() {
            let shape = self.read_envelope(library, name)?.origin_shape();
            let frame = batches_to_series(&batches)?;
            Ok(Item::Series(match shape {
                Some(shape) => frame.with_shape(shape),
                None => frame,
            }))
        } else {
            Ok(Item::Model(batches_to_model(&batches)?))
        }
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn remove_item(&mut self, library: Library, name: &str) -> Result<()> {
        if !self.item_exists(library, name)? {
            return Err(Error::not_found(library, name));
        }
        fs::remove_dir_all(self.item_dir(library, name))?;
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
            None => fs::remove_dir_all(&self.root)?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelRecord, ModelValue};
    use crate::series::TimeSeries;
    use chrono::NaiveDate;

    fn index(n: usize) -> Vec<chrono::NaiveDateTime> {
        let t0 = NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        (0..n).map(|i| t0 + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn test_layout_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = ParquetConnector::new("proj", dir.path()).unwrap();
        let series = TimeSeries::series(index(3), vec![0.0, -2.5, f64::NAN]).unwrap();
        conn.add_stress(&series, "prec", Some("prec"), None, false).unwrap();

        let item = dir.path().join("proj/stresses/prec");
        assert!(item.join(DATA_FILE).is_file());
        assert!(item.join(METADATA_FILE).is_file());
        assert_eq!(conn.get_stress("prec").unwrap(), series);
    }

    #[test]
    fn test_failed_envelope_write_keeps_old_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = ParquetConnector::new("proj", dir.path()).unwrap();
        let frame = TimeSeries::frame(index(2), vec![("h".into(), vec![1.0, 2.0])]).unwrap();
        conn.add_oseries(&frame, "w", None, false).unwrap();

        let item = dir.path().join("proj/oseries/w");
        fs::create_dir(item.join(format!("{METADATA_FILE}.tmp"))).unwrap();
        let series = TimeSeries::series(index(1), vec![5.0]).unwrap();
        assert!(conn.add_oseries(&series, "w", None, true).is_err());

        let back = conn.get_oseries("w").unwrap();
        assert_eq!(back, frame);
        assert!(!back.is_series());
    }

    #[test]
    fn test_frame_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = ParquetConnector::new("proj", dir.path()).unwrap();
        let frame = TimeSeries::frame(
            index(2),
            vec![("a".to_string(), vec![1.0, 2.0]), ("b".to_string(), vec![3.0, 4.0])],
        )
        .unwrap();
        conn.add_oseries(&frame, "multi", None, false).unwrap();

        let back = conn.get_oseries("multi").unwrap();
        assert_eq!(back.column_names(), vec!["a", "b"]);
        assert_eq!(back, frame);
    }

    #[test]
    fn test_model_payload_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = ParquetConnector::new("proj", dir.path()).unwrap();
        let mut model = ModelRecord::new("ml");
        model.insert("settings", ModelValue::Map(vec![("freq".to_string(), "D".into())]));
        conn.add_model(&model, false).unwrap();

        assert!(!dir.path().join("proj/models/ml").join(METADATA_FILE).exists());
        assert_eq!(conn.get_model("ml").unwrap(), model);
    }

    #[test]
    fn test_stray_directories_are_not_items() {
        let dir = tempfile::tempdir().unwrap();
        let conn = ParquetConnector::new("proj", dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("proj/oseries/half_written")).unwrap();

        assert!(conn.oseries_names().unwrap().is_empty());
        assert!(conn.get_oseries("half_written").unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_series_keeps_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = ParquetConnector::new("proj", dir.path()).unwrap();
        let empty = TimeSeries::series(Vec::new(), Vec::new()).unwrap();
        conn.add_oseries(&empty, "empty", None, false).unwrap();

        let back = conn.get_oseries("empty").unwrap();
        assert!(back.is_series());
        assert!(back.is_empty());
    }

    #[test]
    fn test_delete_whole_project() {
        let dir = tempfile::tempdir().unwrap();
        let conn = ParquetConnector::new("proj", dir.path()).unwrap();
        conn.delete_libraries(None).unwrap();
        assert!(!dir.path().join("proj").exists());
        assert!(dir.path().is_dir());
    }
}
