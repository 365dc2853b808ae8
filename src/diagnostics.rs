//! Connector diagnostics
//!
//! Notable events (libraries created or linked on construction, items
//! overwritten, metadata ignored) are always emitted as `tracing` events and,
//! when a [`DiagnosticSink`] was injected at construction, also handed to it.
//! No process-global state is touched.

use std::fmt;
use std::sync::Arc;

use crate::library::Library;

/// Event reported by a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Library did not exist and was created
    LibraryCreated {
        /// Connector name
        connector: String,
        /// Library
        library: Library,
        /// Backend location (directory, table)
        location: String,
    },
    /// Library already existed and was linked
    LibraryLinked {
        /// Connector name
        connector: String,
        /// Library
        library: Library,
        /// Backend location (directory, table)
        location: String,
    },
    /// Existing item replaced on request
    ItemOverwritten {
        /// Library
        library: Library,
        /// Item name
        name: String,
    },
    /// Metadata passed for the models library, which has no envelope
    MetadataIgnored {
        /// Item name
        name: String,
    },
    /// Backend storage deleted
    StorageDeleted {
        /// Connector name
        connector: String,
        /// Libraries removed
        libraries: Vec<Library>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LibraryCreated {
                connector,
                library,
                location,
            } => write!(f, "{connector}: library '{library}' created in {location}"),
            Self::LibraryLinked {
                connector,
                library,
                location,
            } => write!(
                f,
                "{connector}: library '{library}' already exists. Linking to existing {location}"
            ),
            Self::ItemOverwritten { library, name } => {
                write!(f, "item '{name}' in '{library}' library overwritten")
            }
            Self::MetadataIgnored { name } => {
                write!(f, "metadata for model '{name}' ignored, models carry no envelope")
            }
            Self::StorageDeleted {
                connector,
                libraries,
            } => {
                let names: Vec<_> = libraries.iter().map(Library::as_str).collect();
                write!(f, "{connector}: deleted libraries [{}]", names.join(", "))
            }
        }
    }
}

/// Callback receiving diagnostics.
pub type DiagnosticSink = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Emits diagnostics to `tracing` and an optional sink.
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<DiagnosticSink>,
}

impl Diagnostics {
    /// Tracing only
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracing plus a sink
    #[must_use]
    pub fn with_sink(sink: DiagnosticSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// Report an event
    pub fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::ItemOverwritten { .. } | Diagnostic::MetadataIgnored { .. } => {
                tracing::warn!(target: "hydrostore", "{diagnostic}");
            }
            _ => tracing::info!(target: "hydrostore", "{diagnostic}"),
        }
        if let Some(sink) = &self.sink {
            sink(&diagnostic);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Install a `tracing-subscriber` formatter honouring `RUST_LOG`
/// (default filter `hydrostore=info`).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hydrostore=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sink_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let diagnostics = Diagnostics::with_sink(Arc::new(move |d: &Diagnostic| {
            captured.lock().unwrap().push(d.clone());
        }));

        diagnostics.emit(Diagnostic::ItemOverwritten {
            library: Library::Oseries,
            name: "well_A".to_string(),
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].to_string(),
            "item 'well_A' in 'oseries' library overwritten"
        );
    }

    #[test]
    fn test_linked_message() {
        let d = Diagnostic::LibraryLinked {
            connector: "pas".to_string(),
            library: Library::Models,
            location: "directory: /tmp/x/models".to_string(),
        };
        assert!(d.to_string().contains("already exists. Linking to existing"));
    }

    #[test]
    fn test_no_sink_is_fine() {
        Diagnostics::new().emit(Diagnostic::StorageDeleted {
            connector: "dict".to_string(),
            libraries: Library::ALL.to_vec(),
        });
        assert!(format!("{:?}", Diagnostics::new()).contains("sink: false"));
    }
}
