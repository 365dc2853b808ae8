//! Tests for error types

use hydrostore::{Error, Library};

#[test]
fn test_not_found_error() {
    let error = Error::not_found(Library::Oseries, "well_A");
    assert_eq!(format!("{error}"), "Item 'well_A' not in 'oseries' library");
    assert!(error.is_not_found());
}

#[test]
fn test_already_exists_error() {
    let error = Error::already_exists(Library::Models, "ml");
    let error_str = format!("{error}");
    assert!(error_str.contains("Item 'ml' already in 'models' library"));
    assert!(error_str.contains("overwrite=true"));
    assert!(!error.is_not_found());
}

#[test]
fn test_backend_unavailable_error() {
    let error = Error::BackendUnavailable("cannot open 'x.db'".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Backend unavailable"));
    assert!(error_str.contains("x.db"));
}

#[test]
fn test_serialization_error() {
    let error = Error::Serialization("duplicate timestamp".to_string());
    assert_eq!(format!("{error}"), "Serialization error: duplicate timestamp");
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("bad name".to_string());
    assert!(format!("{error}").starts_with("Invalid input"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: Error = io.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_json_error_conversion() {
    let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json.into();
    assert!(format!("{error}").starts_with("JSON error"));
}

#[test]
fn test_sqlite_error_conversion() {
    let error: Error = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(format!("{error}").starts_with("SQLite error"));
}

#[test]
fn test_error_debug() {
    let error = Error::not_found(Library::Stresses, "prec");
    let debug = format!("{error:?}");
    assert!(debug.contains("NotFound"));
    assert!(debug.contains("Stresses"));
}

#[test]
fn test_errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
