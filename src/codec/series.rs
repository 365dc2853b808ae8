//! Series <-> JSON text, columns orient
//!
//! ```text
//! {"well_A": {"2020-01-01T00:00:00": 1.0, "2020-01-01T01:00:00": null}}
//! ```
//!
//! Bare series are written as one column named after the item. Timestamps keep
//! nanosecond precision, values keep full `f64` precision, NaN is `null` and
//! infinities are the strings `"inf"` and `"-inf"`.

use chrono::NaiveDateTime;
use serde_json::{Map, Number, Value};

use crate::series::{Shape, TimeSeries};
use crate::{Error, Result};

/// Timestamp format on the wire (fraction omitted when zero)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Format a timestamp for the wire
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a wire timestamp
///
/// # Errors
/// Returns [`Error::Serialization`] if `s` is not in [`TIMESTAMP_FORMAT`]
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| Error::Serialization(format!("invalid timestamp '{s}': {e}")))
}

/// Wire form of a cell: number, `null` for NaN, `"inf"`/`"-inf"` for infinities.
pub(crate) fn number_or_null(x: f64) -> Value {
    if x.is_infinite() {
        let repr = if x > 0.0 { "inf" } else { "-inf" };
        return Value::String(repr.to_string());
    }
    Number::from_f64(x).map_or(Value::Null, Value::Number)
}

pub(crate) fn number_or_nan(v: &Value, context: &str) -> Result<f64> {
    match v {
        Value::Null => Ok(f64::NAN),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Serialization(format!("{context}: number out of range"))),
        Value::String(s) if s == "inf" => Ok(f64::INFINITY),
        Value::String(s) if s == "-inf" => Ok(f64::NEG_INFINITY),
        other => Err(Error::Serialization(format!(
            "{context}: expected number or null, got {other}"
        ))),
    }
}

/// Columns-orient JSON value of a series.
///
/// # Errors
/// Returns [`Error::Serialization`] if the index holds duplicate timestamps,
/// which a JSON object cannot represent
pub fn series_to_value(series: &TimeSeries, name: &str) -> Result<Value> {
    let keys: Vec<String> = series.index().iter().map(format_timestamp).collect();
    let mut columns = Map::new();
    for (column, values) in series.iter_columns(name) {
        let mut col = Map::with_capacity(keys.len());
        for (key, &x) in keys.iter().zip(values) {
            col.insert(key.clone(), number_or_null(x));
        }
        if col.len() != keys.len() {
            return Err(Error::Serialization(format!(
                "series '{name}' has duplicate timestamps"
            )));
        }
        columns.insert(column.to_string(), Value::Object(col));
    }
    Ok(Value::Object(columns))
}

/// Frame from a columns-orient JSON value.
///
/// Every column must carry the same timestamps in the same order.
///
/// # Errors
/// Returns [`Error::Serialization`] on malformed structure
pub fn series_from_value(value: &Value) -> Result<TimeSeries> {
    let Value::Object(columns) = value else {
        return Err(Error::Serialization(
            "series payload must be a JSON object of columns".to_string(),
        ));
    };

    let mut index: Option<Vec<NaiveDateTime>> = None;
    let mut data = Vec::with_capacity(columns.len());
    for (column, col) in columns {
        let Value::Object(cells) = col else {
            return Err(Error::Serialization(format!(
                "column '{column}' must be a JSON object keyed by timestamp"
            )));
        };
        let mut stamps = Vec::with_capacity(cells.len());
        let mut values = Vec::with_capacity(cells.len());
        for (key, cell) in cells {
            stamps.push(parse_timestamp(key)?);
            values.push(number_or_nan(cell, column)?);
        }
        match &index {
            None => index = Some(stamps),
            Some(first) if *first == stamps => {}
            Some(_) => {
                return Err(Error::Serialization(format!(
                    "column '{column}' is not aligned with the first column"
                )))
            }
        }
        data.push((column.clone(), values));
    }

    TimeSeries::frame(index.unwrap_or_default(), data)
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a series as JSON text.
///
/// # Errors
/// See [`series_to_value`]
pub fn encode_series(series: &TimeSeries, name: &str) -> Result<String> {
    Ok(serde_json::to_string(&series_to_value(series, name)?)?)
}

/// Decode JSON text, restoring the recorded shape if any.
///
/// # Errors
/// Returns [`Error::Serialization`] on malformed text or structure
pub fn decode_series(text: &str, shape: Option<Shape>) -> Result<TimeSeries> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::Serialization(format!("series payload is not JSON: {e}")))?;
    let frame = series_from_value(&value)?;
    Ok(match shape {
        Some(shape) => frame.with_shape(shape),
        None => frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn hourly(n: usize) -> Vec<NaiveDateTime> {
        let t0 = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| t0 + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn test_wire_layout_columns_orient() {
        let s = TimeSeries::series(hourly(2), vec![1.0, f64::NAN]).unwrap();
        let text = encode_series(&s, "well_A").unwrap();
        assert_eq!(
            text,
            r#"{"well_A":{"2020-01-01T00:00:00":1.0,"2020-01-01T01:00:00":null}}"#
        );
    }

    #[test]
    fn test_bare_series_restored_with_shape() {
        let s = TimeSeries::series(hourly(3), vec![1.0, 2.0, f64::NAN]).unwrap();
        let text = encode_series(&s, "well_A").unwrap();

        assert_eq!(decode_series(&text, Some(Shape::Series)).unwrap(), s);
        let frame = decode_series(&text, None).unwrap();
        assert_eq!(frame.shape(), Shape::Frame);
        assert_eq!(frame.column_names(), vec!["well_A"]);
    }

    #[test]
    fn test_subsecond_precision_kept() {
        let t = hourly(1)[0] + Duration::nanoseconds(123_456_789);
        let s = TimeSeries::series(vec![t], vec![0.1 + 0.2]).unwrap();
        let text = encode_series(&s, "x").unwrap();
        assert!(text.contains("2020-01-01T00:00:00.123456789"));
        assert_eq!(decode_series(&text, Some(Shape::Series)).unwrap(), s);
    }

    #[test]
    fn test_infinities_round_trip() {
        let s = TimeSeries::series(hourly(3), vec![f64::INFINITY, f64::NEG_INFINITY, -0.0]).unwrap();
        let text = encode_series(&s, "x").unwrap();
        assert!(text.contains(r#""inf""#));
        assert_eq!(decode_series(&text, Some(Shape::Series)).unwrap(), s);
        assert!(decode_series(r#"{"x":{"2020-01-01T00:00:00":"high"}}"#, None).is_err());
    }

    #[test]
    fn test_duplicate_timestamps_rejected() {
        let t = hourly(1)[0];
        let s = TimeSeries::series(vec![t, t], vec![1.0, 2.0]).unwrap();
        let err = encode_series(&s, "dup").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_misaligned_columns_rejected() {
        let text = r#"{"a":{"2020-01-01T00:00:00":1.0},"b":{"2020-01-02T00:00:00":1.0}}"#;
        let err = decode_series(text, None).unwrap_err();
        assert!(err.to_string().contains("not aligned"));
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        assert!(matches!(
            decode_series("not json", None),
            Err(Error::Serialization(_))
        ));
        assert!(matches!(
            decode_series(r#"{"a": {"yesterday": 1.0}}"#, None),
            Err(Error::Serialization(_))
        ));
        assert!(matches!(
            decode_series(r#"{"a": {"2020-01-01T00:00:00": "wet"}}"#, None),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_empty_frame() {
        let f = TimeSeries::frame(vec![], vec![]).unwrap();
        let text = encode_series(&f, "empty").unwrap();
        assert_eq!(text, "{}");
        assert_eq!(decode_series(&text, Some(Shape::Frame)).unwrap(), f);
    }
}
