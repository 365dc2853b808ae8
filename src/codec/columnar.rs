//! Series and model records <-> Arrow `RecordBatch`
//!
//! Series layout: column 0 is the index (`Timestamp(Nanosecond, None)`), the
//! remaining columns are `Float64` values. The columnar engine cannot hold a
//! bare series, so bare series are written as a one-column frame named after
//! the item; the shape is restored from the envelope.
//!
//! Model layout: one row, one `Utf8` column holding the model JSON.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};

use crate::model::ModelRecord;
use crate::series::TimeSeries;
use crate::{Error, Result};

/// Name of the index column
pub const INDEX_COLUMN: &str = "__index__";

/// Name of the model payload column
pub const MODEL_COLUMN: &str = "model";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

fn to_nanos(ts: &NaiveDateTime) -> Result<i64> {
    ts.and_utc().timestamp_nanos_opt().ok_or_else(|| {
        Error::Serialization(format!(
            "timestamp {ts} outside the nanosecond range of the columnar store"
        ))
    })
}

fn from_nanos(nanos: i64) -> Result<NaiveDateTime> {
    let secs = nanos.div_euclid(NANOS_PER_SECOND);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
    DateTime::from_timestamp(secs, subsec)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| Error::Serialization(format!("invalid timestamp {nanos}ns")))
}

/// Record batch of a series, a bare series named `name`.
///
/// # Errors
/// Returns [`Error::Serialization`] for timestamps outside 1677-2262
pub fn series_to_batch(series: &TimeSeries, name: &str) -> Result<RecordBatch> {
    let nanos = series.index().iter().map(to_nanos).collect::<Result<Vec<_>>>()?;

    let mut fields = vec![Field::new(
        INDEX_COLUMN,
        DataType::Timestamp(TimeUnit::Nanosecond, None),
        false,
    )];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(TimestampNanosecondArray::from(nanos))];
    for (column, values) in series.iter_columns(name) {
        fields.push(Field::new(column, DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from(values.to_vec())));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::Serialization(format!(
            "column '{column}' has unexpected type {}",
            array.data_type()
        ))
    })
}

/// Frame from record batches written by [`series_to_batch`].
///
/// # Errors
/// Returns [`Error::Serialization`] if the batches do not have the series layout
pub fn batches_to_series(batches: &[RecordBatch]) -> Result<TimeSeries> {
    let Some(first) = batches.first() else {
        return TimeSeries::frame(Vec::new(), Vec::new());
    };
    let schema = first.schema();
    if schema.fields().is_empty() {
        return Err(Error::Serialization("series batch has no index column".to_string()));
    }

    let mut index = Vec::new();
    let mut columns: Vec<(String, Vec<f64>)> = schema
        .fields()
        .iter()
        .skip(1)
        .map(|f| (f.name().clone(), Vec::new()))
        .collect();

    for batch in batches {
        if batch.schema() != schema {
            return Err(Error::Serialization("series batches disagree on schema".to_string()));
        }
        let stamps = downcast::<TimestampNanosecondArray>(batch.column(0), INDEX_COLUMN)?;
        for nanos in stamps.values().iter() {
            index.push(from_nanos(*nanos)?);
        }
        for (i, (name, values)) in columns.iter_mut().enumerate() {
            let array = downcast::<Float64Array>(batch.column(i + 1), name)?;
            values.extend(
                (0..array.len()).map(|row| if array.is_null(row) { f64::NAN } else { array.value(row) }),
            );
        }
    }

    TimeSeries::frame(index, columns).map_err(|e| Error::Serialization(e.to_string()))
}

/// One-row record batch holding a model's JSON.
///
/// # Errors
/// Returns an error if the model cannot be encoded
pub fn model_to_batch(model: &ModelRecord) -> Result<RecordBatch> {
    let json = super::model::encode_model(model)?;
    let schema = Schema::new(vec![Field::new(MODEL_COLUMN, DataType::Utf8, false)]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(StringArray::from(vec![json]))],
    )?)
}

/// Model from record batches written by [`model_to_batch`].
///
/// # Errors
/// Returns [`Error::Serialization`] unless the batches hold exactly one model row
pub fn batches_to_model(batches: &[RecordBatch]) -> Result<ModelRecord> {
    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    if rows != 1 {
        return Err(Error::Serialization(format!(
            "model payload has {rows} rows, expected 1"
        )));
    }
    let batch = batches
        .iter()
        .find(|b| b.num_rows() == 1)
        .ok_or_else(|| Error::Serialization("model payload is empty".to_string()))?;
    let column = batch
        .column_by_name(MODEL_COLUMN)
        .ok_or_else(|| Error::Serialization(format!("model payload lacks '{MODEL_COLUMN}'")))?;
    let json = downcast::<StringArray>(column, MODEL_COLUMN)?;
    super::model::decode_model(json.value(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Shape;
    use chrono::{Duration, NaiveDate};

    fn hourly(n: usize) -> Vec<NaiveDateTime> {
        let t0 = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| t0 + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn test_series_batch_layout() {
        let s = TimeSeries::series(hourly(3), vec![1.0, 2.0, f64::NAN]).unwrap();
        let batch = series_to_batch(&s, "well_A").unwrap();

        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.schema().field(0).name(), INDEX_COLUMN);
        assert_eq!(batch.schema().field(1).name(), "well_A");
    }

    #[test]
    fn test_batch_round_trip_restores_shape() {
        let s = TimeSeries::series(hourly(3), vec![-1.0, 0.0, f64::NAN]).unwrap();
        let batch = series_to_batch(&s, "well_A").unwrap();
        let frame = batches_to_series(&[batch]).unwrap();

        assert_eq!(frame.shape(), Shape::Frame);
        assert_eq!(frame.with_shape(Shape::Series), s);
    }

    #[test]
    fn test_multiple_batches_concatenate() {
        let a = TimeSeries::frame(hourly(2), vec![("p".into(), vec![1.0, 2.0])]).unwrap();
        let b = TimeSeries::frame(hourly(4)[2..].to_vec(), vec![("p".into(), vec![3.0, 4.0])])
            .unwrap();
        let batches = vec![series_to_batch(&a, "p").unwrap(), series_to_batch(&b, "p").unwrap()];

        let joined = batches_to_series(&batches).unwrap();
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.column("p"), Some(&[1.0, 2.0, 3.0, 4.0][..]));
    }

    #[test]
    fn test_pre_epoch_subsecond_timestamps() {
        let t = NaiveDate::from_ymd_opt(1950, 6, 1)
            .unwrap()
            .and_hms_nano_opt(12, 0, 0, 1)
            .unwrap();
        let s = TimeSeries::series(vec![t], vec![0.5]).unwrap();
        let back = batches_to_series(&[series_to_batch(&s, "x").unwrap()])
            .unwrap()
            .squeeze();
        assert_eq!(back, s);
    }

    #[test]
    fn test_out_of_range_timestamp_rejected() {
        let t = NaiveDate::from_ymd_opt(1500, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let s = TimeSeries::series(vec![t], vec![0.5]).unwrap();
        assert!(matches!(series_to_batch(&s, "x"), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_model_batch_round_trip() {
        let mut ml = ModelRecord::new("m");
        ml.insert("tmin", hourly(1)[0]);
        let back = batches_to_model(&[model_to_batch(&ml).unwrap()]).unwrap();
        assert_eq!(back, ml);
    }

    #[test]
    fn test_empty_model_payload_rejected() {
        assert!(matches!(batches_to_model(&[]), Err(Error::Serialization(_))));
    }
}
