//! Name validation, copying between connectors and storage maintenance helpers.

use crate::connector::Connector;
use crate::library::Library;
use crate::{Error, Result};

/// Characters that cannot appear in file names on common platforms.
const INVALID_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Make a name safe to use as an item name.
///
/// Spaces become `_`; path separators, characters invalid in file names and
/// control characters are removed.
///
/// ```rust
/// assert_eq!(hydrostore::util::validate_name("well A/1"), "well_A1");
/// ```
#[must_use]
pub fn validate_name(name: &str) -> String {
    name.chars()
        .filter(|c| !INVALID_CHARS.contains(c) && !c.is_control())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Reject names that no backend can store uniformly.
///
/// # Errors
/// Returns [`Error::InvalidInput`] for empty names, `.`/`..`, names containing
/// characters removed by [`validate_name`], and series names ending in
/// `_meta` (reserved for flat-file sidecars)
pub fn check_item_name(library: Library, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!("invalid item name '{name}'")));
    }
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c) || c.is_control()) {
        return Err(Error::InvalidInput(format!(
            "item name '{name}' contains invalid character {c:?}"
        )));
    }
    if library.holds_series() && name.ends_with("_meta") {
        return Err(Error::InvalidInput(format!(
            "series name '{name}' may not end in '_meta'"
        )));
    }
    Ok(())
}

/// Delete the backend storage of a connector.
///
/// With `libraries == None` every library (and, for directory backends, the
/// root directory) is removed; otherwise only the listed libraries.
///
/// # Errors
/// Returns backend errors
pub fn delete_connector_storage<C: Connector>(conn: C, libraries: Option<&[Library]>) -> Result<()> {
    tracing::info!(
        connector = conn.name(),
        conn_type = %conn.conn_type(),
        "deleting connector storage"
    );
    conn.delete_libraries(libraries)
}

/// Copy libraries from one connector to another.
///
/// Series travel with their metadata; models as full records. With
/// `libraries == None` all three libraries are copied. The source is only
/// read, so any pair of backends works.
///
/// # Errors
/// Returns [`Error::AlreadyExists`] for an item already in `dst` when
/// `overwrite` is false, and backend errors from either side. Items copied
/// before the error stay in `dst`.
pub fn copy_database<A: Connector, B: Connector>(
    src: &A,
    dst: &mut B,
    libraries: Option<&[Library]>,
    overwrite: bool,
) -> Result<()> {
    for &library in libraries.unwrap_or(&Library::ALL) {
        let names = src.list_names(library)?;
        tracing::info!(
            from = src.name(),
            to = dst.name(),
            %library,
            n_items = names.len(),
            "copying library"
        );
        for name in names {
            let item = src.get_item(library, &name)?;
            let metadata = if library.holds_series() {
                Some(src.get_metadata(library, &name)?)
            } else {
                None
            };
            dst.add_item(library, (&item).into(), &name, metadata.as_ref(), overwrite)?;
        }
    }
    Ok(())
}
