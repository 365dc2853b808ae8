//! Model records
//!
//! A [`ModelRecord`] is the full serializable state of a fitted model: an
//! ordered, arbitrarily nested mapping whose leaves may be plain scalars or
//! domain substructures (timestamps, numeric arrays, embedded series and
//! parameter tables). Key order is significant and survives storage.
//!
//! Model metadata, if any, lives inside the record itself; the models library
//! has no separate metadata envelope.

use chrono::NaiveDateTime;

use crate::series::TimeSeries;
use crate::{Error, Result};

/// Key holding the model name in the root mapping
pub const NAME_KEY: &str = "name";

/// A value inside a model record.
#[derive(Debug, Clone)]
pub enum ModelValue {
    /// Missing value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number, non-finite values allowed
    Float(f64),
    /// Text
    Str(String),
    /// Timestamp (e.g. calibration period bounds)
    Timestamp(NaiveDateTime),
    /// Numeric array, NaN allowed
    Array(Vec<f64>),
    /// Embedded time series
    Series(TimeSeries),
    /// Parameter table
    Parameters(ParameterTable),
    /// Ordered list
    List(Vec<ModelValue>),
    /// Ordered mapping
    Map(Vec<(String, ModelValue)>),
}

impl ModelValue {
    /// Look up a key if this is a mapping
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// First mapping key, at any depth, that occurs twice in its mapping
    #[must_use]
    pub fn duplicate_key(&self) -> Option<&str> {
        match self {
            Self::Map(entries) => entries.iter().enumerate().find_map(|(i, (key, value))| {
                if entries[..i].iter().any(|(k, _)| k == key) {
                    Some(key.as_str())
                } else {
                    value.duplicate_key()
                }
            }),
            Self::List(items) => items.iter().find_map(Self::duplicate_key),
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

fn f64_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn slice_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| f64_eq(*x, *y))
}

impl PartialEq for ModelValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => f64_eq(*a, *b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => slice_eq(a, b),
            (Self::Series(a), Self::Series(b)) => a == b,
            (Self::Parameters(a), Self::Parameters(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for ModelValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ModelValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ModelValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ModelValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ModelValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<NaiveDateTime> for ModelValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Vec<f64>> for ModelValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Array(v)
    }
}

impl From<TimeSeries> for ModelValue {
    fn from(v: TimeSeries) -> Self {
        Self::Series(v)
    }
}

impl From<ParameterTable> for ModelValue {
    fn from(v: ParameterTable) -> Self {
        Self::Parameters(v)
    }
}

/// One row of a parameter table.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name (table index)
    pub name: String,
    /// Initial value
    pub initial: f64,
    /// Lower bound (NaN when unbounded)
    pub pmin: f64,
    /// Upper bound (NaN when unbounded)
    pub pmax: f64,
    /// Whether the parameter is varied during fitting
    pub vary: bool,
    /// Name of the model component owning the parameter
    pub group: String,
    /// Optimal value (NaN before fitting)
    pub optimal: f64,
    /// Standard error of the optimal value (NaN before fitting)
    pub stderr: f64,
}

impl Parameter {
    /// Unfitted parameter with open bounds
    pub fn new(name: impl Into<String>, group: impl Into<String>, initial: f64) -> Self {
        Self {
            name: name.into(),
            initial,
            pmin: f64::NAN,
            pmax: f64::NAN,
            vary: true,
            group: group.into(),
            optimal: f64::NAN,
            stderr: f64::NAN,
        }
    }

    /// Set bounds
    #[must_use]
    pub fn bounds(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = pmin;
        self.pmax = pmax;
        self
    }

    /// Set fit results
    #[must_use]
    pub fn fitted(mut self, optimal: f64, stderr: f64) -> Self {
        self.optimal = optimal;
        self.stderr = stderr;
        self
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.vary == other.vary
            && self.group == other.group
            && slice_eq(
                &[self.initial, self.pmin, self.pmax, self.optimal, self.stderr],
                &[other.initial, other.pmin, other.pmax, other.optimal, other.stderr],
            )
    }
}

/// Table of model parameters, ordered by insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
    rows: Vec<Parameter>,
}

impl ParameterTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if a parameter with the same name exists
    pub fn push(&mut self, parameter: Parameter) -> Result<()> {
        if self.get(&parameter.name).is_some() {
            return Err(Error::InvalidInput(format!(
                "duplicate parameter '{}'",
                parameter.name
            )));
        }
        self.rows.push(parameter);
        Ok(())
    }

    /// Look up a parameter by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.rows.iter().find(|p| p.name == name)
    }

    /// Rows in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.rows.iter()
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TryFrom<Vec<Parameter>> for ParameterTable {
    type Error = Error;

    fn try_from(rows: Vec<Parameter>) -> Result<Self> {
        let mut table = Self::new();
        for parameter in rows {
            table.push(parameter)?;
        }
        Ok(table)
    }
}

/// Serializable state of a fitted model.
///
/// The root is an ordered mapping whose `name` entry identifies the model.
///
/// # Example
///
/// ```rust
/// use hydrostore::model::{ModelRecord, ModelValue};
///
/// let mut ml = ModelRecord::new("well_A_model");
/// ml.insert("settings", ModelValue::Map(vec![("freq".into(), "D".into())]));
///
/// assert_eq!(ml.name(), "well_A_model");
/// assert_eq!(ml.get_path(&["settings", "freq"]).and_then(ModelValue::as_str), Some("D"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    entries: Vec<(String, ModelValue)>,
}

impl ModelRecord {
    /// Record holding only its name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entries: vec![(NAME_KEY.to_string(), ModelValue::Str(name.into()))],
        }
    }

    /// Build from a root mapping.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] unless the mapping has a text `name`
    /// entry and no duplicate keys
    pub fn from_entries(entries: Vec<(String, ModelValue)>) -> Result<Self> {
        for (i, (key, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(k, _)| k == key) {
                return Err(Error::InvalidInput(format!("duplicate model key '{key}'")));
            }
        }
        let record = Self { entries };
        match record.get(NAME_KEY) {
            Some(ModelValue::Str(_)) => Ok(record),
            _ => Err(Error::InvalidInput(
                "model record needs a text 'name' entry".to_string(),
            )),
        }
    }

    /// Model name
    #[must_use]
    pub fn name(&self) -> &str {
        self.get(NAME_KEY).and_then(ModelValue::as_str).unwrap_or_default()
    }

    /// Root entries in order
    #[must_use]
    pub fn entries(&self) -> &[(String, ModelValue)] {
        &self.entries
    }

    /// Consume into root entries
    #[must_use]
    pub fn into_entries(self) -> Vec<(String, ModelValue)> {
        self.entries
    }

    /// Look up a root entry
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ModelValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First nested mapping key that occurs twice; root keys are unique
    #[must_use]
    pub fn duplicate_key(&self) -> Option<&str> {
        self.entries.iter().find_map(|(_, value)| value.duplicate_key())
    }

    /// Follow a path of mapping keys from the root
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&ModelValue> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.get(first)?, |value, key| value.get(key))
    }

    /// Insert or replace a root entry; a replaced entry keeps its position.
    ///
    /// Replacing `name` with anything but text is ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ModelValue>) {
        let key = key.into();
        let value = value.into();
        if key == NAME_KEY && !matches!(value, ModelValue::Str(_)) {
            return;
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }
}
