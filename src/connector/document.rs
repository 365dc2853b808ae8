//! Document-store connector backed by SQLite.
//!
//! Each library is one table named `<project>.<library>`:
//!
//! ```sql
//! CREATE TABLE "<project>.<library>" (
//!     name     TEXT PRIMARY KEY NOT NULL,
//!     payload  TEXT NOT NULL,   -- series or model JSON
//!     metadata TEXT             -- envelope JSON, NULL for models
//! )
//! ```

use rusqlite::{params, Connection, OptionalExtension};

use super::{Connector, ConnectorType, Item, ItemRef};
use crate::codec::{decode_metadata, decode_model, decode_series, encode_metadata, encode_model, encode_series};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::library::{Library, LibraryHandles};
use crate::metadata::Metadata;
use crate::{Error, Result};

/// Connector storing items as JSON documents in SQLite tables.
///
/// `connstr` is a database path, `:memory:` or a `file:` URI.
pub struct DocumentConnector {
    name: String,
    connstr: String,
    conn: Connection,
    tables: LibraryHandles<String>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for DocumentConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentConnector")
            .field("name", &self.name)
            .field("connstr", &self.connstr)
            .finish_non_exhaustive()
    }
}

/// Quoted SQL identifier.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

impl DocumentConnector {
    /// Connect and create or link the three library tables.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if the database cannot be opened
    pub fn new(name: impl Into<String>, connstr: impl Into<String>) -> Result<Self> {
        Self::with_diagnostics(name, connstr, Diagnostics::new())
    }

    /// Like [`DocumentConnector::new`], reporting to `diagnostics`.
    ///
    /// # Errors
    /// Returns [`Error::BackendUnavailable`] if the database cannot be opened
    pub fn with_diagnostics(
        name: impl Into<String>,
        connstr: impl Into<String>,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let name = name.into();
        let connstr = connstr.into();
        let conn = Connection::open(&connstr)
            .map_err(|e| Error::BackendUnavailable(format!("cannot open '{connstr}': {e}")))?;

        let tables = LibraryHandles::try_init(|library| {
            let table = format!("{name}.{library}");
            let location = format!("table: {table}");
            let exists = table_exists(&conn, &table)
                .map_err(|e| Error::BackendUnavailable(format!("cannot query '{connstr}': {e}")))?;
            if exists {
                diagnostics.emit(Diagnostic::LibraryLinked {
                    connector: name.clone(),
                    library,
                    location,
                });
            } else {
                conn.execute(
                    &format!(
                        "CREATE TABLE {} (name TEXT PRIMARY KEY NOT NULL, payload TEXT NOT NULL, metadata TEXT)",
                        quote_ident(&table)
                    ),
                    [],
                )
                .map_err(|e| Error::BackendUnavailable(format!("cannot create {table}: {e}")))?;
                diagnostics.emit(Diagnostic::LibraryCreated {
                    connector: name.clone(),
                    library,
                    location,
                });
            }
            Ok(table)
        })?;

        Ok(Self {
            name,
            connstr,
            conn,
            tables,
            diagnostics,
        })
    }

    /// Connection string
    #[must_use]
    pub fn connstr(&self) -> &str {
        &self.connstr
    }

    fn table(&self, library: Library) -> String {
        quote_ident(self.tables.get(library))
    }

    fn load_row(&self, library: Library, name: &str) -> Result<(String, Option<String>)> {
        let sql = format!("SELECT payload, metadata FROM {} WHERE name = ?1", self.table(library));
        self.conn
            .query_row(&sql, params![name], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?
            .ok_or_else(|| Error::not_found(library, name))
    }
}

impl Connector for DocumentConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn conn_type(&self) -> ConnectorType {
        ConnectorType::Document
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn library_exists(&self, library: Library) -> bool {
        table_exists(&self.conn, self.tables.get(library)).unwrap_or(false)
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn list_names(&self, library: Library) -> Result<Vec<String>> {
        let sql = format!("SELECT name FROM {} ORDER BY name", self.table(library));
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn item_exists(&self, library: Library, name: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE name = ?1", self.table(library));
        let found: Option<i64> = self
            .conn
            .query_row(&sql, params![name], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self, item, metadata), fields(connector = %self.name))]
    fn store_item(
        &mut self,
        library: Library,
        item: ItemRef<'_>,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<()> {
        let (payload, envelope) = match item {
            ItemRef::Series(series) => (
                encode_series(series, name)?,
                Some(encode_metadata(metadata.unwrap_or(&Metadata::new()))?),
            ),
            ItemRef::Model(model) => (encode_model(model)?, None),
        };
        let sql = format!(
            "INSERT OR REPLACE INTO {} (name, payload, metadata) VALUES (?1, ?2, ?3)",
            self.table(library)
        );
        self.conn.execute(&sql, params![name, payload, envelope])?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn load_item(&self, library: Library, name: &str) -> Result<Item> {
        let (payload, envelope) = self.load_row(library, name)?;
        if library.holds_series() {
            let shape = match envelope {
                Some(text) => decode_metadata(&text)?.origin_shape(),
                None => None,
            };
            Ok(Item::Series(decode_series(&payload, shape)?))
        } else {
            Ok(Item::Model(decode_model(&payload)?))
        }
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    fn remove_item(&mut self, library: Library, name: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE name = ?1", self.table(library));
        match self.conn.execute(&sql, params![name])? {
            0 => Err(Error::not_found(library, name)),
            _ => Ok(()),
        }
    }

    fn load_metadata(&self, library: Library, name: &str) -> Result<Metadata> {
        match self.load_row(library, name)?.1 {
            Some(text) => decode_metadata(&text),
            None => Ok(Metadata::new()),
        }
    }

    fn delete_libraries(self, libraries: Option<&[Library]>) -> Result<()> {
        let libraries = libraries.unwrap_or(&Library::ALL);
        for &library in libraries {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", self.table(library)), [])?;
        }
        self.diagnostics.emit(Diagnostic::StorageDeleted {
            connector: self.name.clone(),
            libraries: libraries.to_vec(),
        });
        Ok(())
    }
}
