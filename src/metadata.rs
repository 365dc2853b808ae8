//! Metadata envelope
//!
//! A flat record of scalar values (coordinates, stress kind, ...) attached to
//! every stored series. The original shape of the series is kept in an
//! explicit [`Metadata::origin_shape`] field; it is written next to the
//! scalar values on the wire but never shows up among them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::series::Shape;

/// Scalar metadata value.
///
/// Equality treats two NaN floats as equal, so a stored NaN coordinate
/// compares equal to the one read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Missing value
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    Str(String),
}

impl MetaValue {
    /// Numeric view (integers widen to `f64`)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for MetaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for MetaValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Metadata envelope of a stored series.
///
/// # Example
///
/// ```rust
/// use hydrostore::metadata::Metadata;
///
/// let meta = Metadata::new().with("x", 100.0).with("y", 200.0).with("kind", "prec");
/// assert_eq!(meta.get("kind").and_then(|v| v.as_str()), Some("prec"));
/// assert_eq!(meta.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    values: BTreeMap<String, MetaValue>,
    origin_shape: Option<Shape>,
}

impl Metadata {
    /// Empty envelope
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Option<MetaValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Look up a value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.values.get(key)
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        self.values.remove(key)
    }

    /// Caller-visible scalar values
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, MetaValue> {
        &self.values
    }

    /// Number of scalar values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if there are no scalar values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shape of the series when it was stored
    #[must_use]
    pub const fn origin_shape(&self) -> Option<Shape> {
        self.origin_shape
    }

    /// Record the shape of the series being stored
    pub fn set_origin_shape(&mut self, shape: Option<Shape>) {
        self.origin_shape = shape;
    }

    /// Builder-style [`Metadata::set_origin_shape`]
    #[must_use]
    pub fn with_origin_shape(mut self, shape: Shape) -> Self {
        self.origin_shape = Some(shape);
        self
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            origin_shape: None,
        }
    }
}
