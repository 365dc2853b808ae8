//! Time series items
//!
//! A [`TimeSeries`] is a timestamp index plus either one bare column of
//! values ([`Shape::Series`]) or any number of named columns
//! ([`Shape::Frame`]). The distinction survives storage: several backends can
//! only hold frames, so the connector records the original shape in the
//! metadata envelope and squeezes one-column frames back on read.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Original shape of a stored series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Bare series: one unnamed column
    Series,
    /// Frame: named columns
    Frame,
}

impl Shape {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Frame => "frame",
        }
    }

    /// Parse a wire name
    ///
    /// # Errors
    /// Returns [`Error::Serialization`] for anything but `series` or `frame`
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "series" => Ok(Self::Series),
            "frame" => Ok(Self::Frame),
            other => Err(Error::Serialization(format!("unknown series shape '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
enum Data {
    Series(Vec<f64>),
    Frame(Vec<(String, Vec<f64>)>),
}

/// Time-indexed numeric data.
///
/// Equality is value-wise: timestamps must match exactly and NaN equals NaN.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use hydrostore::series::{Shape, TimeSeries};
///
/// let t0 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let index = vec![t0, t0 + chrono::Duration::hours(1)];
/// let head = TimeSeries::series(index, vec![1.0, f64::NAN])?;
///
/// assert_eq!(head.shape(), Shape::Series);
/// assert_eq!(head.len(), 2);
/// # Ok::<(), hydrostore::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TimeSeries {
    index: Vec<NaiveDateTime>,
    data: Data,
}

impl TimeSeries {
    /// Create a bare series.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if index and values differ in length
    pub fn series(index: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        check_len(&index, "series", &values)?;
        Ok(Self {
            index,
            data: Data::Series(values),
        })
    }

    /// Create a bare series from `(timestamp, value)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDateTime, f64)>) -> Self {
        let (index, values) = pairs.into_iter().unzip();
        Self {
            index,
            data: Data::Series(values),
        }
    }

    /// Create a frame with named columns.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if a column differs in length from the
    /// index, two columns share a name, or there are rows but no columns
    pub fn frame(index: Vec<NaiveDateTime>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if columns.is_empty() && !index.is_empty() {
            return Err(Error::InvalidInput(format!(
                "frame has {} timestamps but no columns",
                index.len()
            )));
        }
        for (i, (name, values)) in columns.iter().enumerate() {
            check_len(&index, name, values)?;
            if columns[..i].iter().any(|(other, _)| other == name) {
                return Err(Error::InvalidInput(format!("duplicate column '{name}'")));
            }
        }
        Ok(Self {
            index,
            data: Data::Frame(columns),
        })
    }

    /// Original shape
    #[must_use]
    pub const fn shape(&self) -> Shape {
        match self.data {
            Data::Series(_) => Shape::Series,
            Data::Frame(_) => Shape::Frame,
        }
    }

    /// True for a bare series
    #[must_use]
    pub const fn is_series(&self) -> bool {
        matches!(self.data, Data::Series(_))
    }

    /// Timestamp index
    #[must_use]
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// True if no timestamp occurs twice
    #[must_use]
    pub fn has_unique_index(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.index.len());
        self.index.iter().all(|t| seen.insert(t))
    }

    /// Number of value columns (1 for a bare series)
    #[must_use]
    pub fn n_columns(&self) -> usize {
        match &self.data {
            Data::Series(_) => 1,
            Data::Frame(columns) => columns.len(),
        }
    }

    /// Values of a bare series, or of the first frame column
    #[must_use]
    pub fn values(&self) -> Option<&[f64]> {
        match &self.data {
            Data::Series(values) => Some(values),
            Data::Frame(columns) => columns.first().map(|(_, v)| v.as_slice()),
        }
    }

    /// Values of a named frame column
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match &self.data {
            Data::Series(_) => None,
            Data::Frame(columns) => columns
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_slice()),
        }
    }

    /// Column names; a bare series has none
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        match &self.data {
            Data::Series(_) => Vec::new(),
            Data::Frame(columns) => columns.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }

    /// Iterate over `(column name, values)`; a bare series is reported under `series_name`.
    pub fn iter_columns<'a>(
        &'a self,
        series_name: &'a str,
    ) -> Box<dyn Iterator<Item = (&'a str, &'a [f64])> + 'a> {
        match &self.data {
            Data::Series(values) => Box::new(std::iter::once((series_name, values.as_slice()))),
            Data::Frame(columns) => {
                Box::new(columns.iter().map(|(n, v)| (n.as_str(), v.as_slice())))
            }
        }
    }

    /// Convert to a frame; a bare series becomes one column named `name`.
    #[must_use]
    pub fn into_frame(self, name: &str) -> Self {
        match self.data {
            Data::Series(values) => Self {
                index: self.index,
                data: Data::Frame(vec![(name.to_string(), values)]),
            },
            Data::Frame(_) => self,
        }
    }

    /// Squeeze a one-column frame back to a bare series.
    ///
    /// Frames with any other column count are returned unchanged.
    #[must_use]
    pub fn squeeze(self) -> Self {
        match self.data {
            Data::Frame(mut columns) if columns.len() == 1 => {
                let (_, values) = columns.remove(0);
                Self {
                    index: self.index,
                    data: Data::Series(values),
                }
            }
            data => Self {
                index: self.index,
                data,
            },
        }
    }

    /// Restore a shape recorded at write time.
    #[must_use]
    pub fn with_shape(self, shape: Shape) -> Self {
        match shape {
            Shape::Series => self.squeeze(),
            Shape::Frame => self,
        }
    }
}

fn check_len(index: &[NaiveDateTime], column: &str, values: &[f64]) -> Result<()> {
    if index.len() == values.len() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "column '{column}' has {} values for an index of {} timestamps",
            values.len(),
            index.len()
        )))
    }
}

/// NaN-aware value equality
fn values_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
}

impl PartialEq for TimeSeries {
    fn eq(&self, other: &Self) -> bool {
        if self.index != other.index {
            return false;
        }
        match (&self.data, &other.data) {
            (Data::Series(a), Data::Series(b)) => values_eq(a, b),
            (Data::Frame(a), Data::Frame(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|((na, va), (nb, vb))| na == nb && values_eq(va, vb))
            }
            _ => false,
        }
    }
}
