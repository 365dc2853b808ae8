//! Metadata envelope <-> JSON object of scalars
//!
//! The original series shape travels under [`ORIGIN_SHAPE_KEY`] and is moved
//! into [`Metadata::origin_shape`] on read, so it never reaches callers as a
//! plain value. NaN and infinite floats are written as `{"$float": "NaN"}`,
//! `{"$float": "inf"}` and `{"$float": "-inf"}`.

use serde_json::{Map, Value};

use crate::metadata::{MetaValue, Metadata};
use crate::series::Shape;
use crate::{Error, Result};

/// Reserved wire key for the original series shape
pub const ORIGIN_SHAPE_KEY: &str = "_origin_shape";

const TAG_FLOAT: &str = "$float";

fn scalar_to_value(value: &MetaValue) -> Result<Value> {
    match value {
        MetaValue::Float(x) if !x.is_finite() => {
            let repr = if x.is_nan() {
                "NaN"
            } else if *x > 0.0 {
                "inf"
            } else {
                "-inf"
            };
            let mut object = Map::with_capacity(1);
            object.insert(TAG_FLOAT.to_string(), Value::String(repr.to_string()));
            Ok(Value::Object(object))
        }
        other => Ok(serde_json::to_value(other)?),
    }
}

fn non_finite_from_value(key: &str, object: &Map<String, Value>) -> Result<MetaValue> {
    let repr = match (object.len(), object.get(TAG_FLOAT)) {
        (1, Some(Value::String(repr))) => repr.as_str(),
        _ => {
            return Err(Error::Serialization(format!(
                "metadata value for '{key}' is not a scalar"
            )))
        }
    };
    let x = match repr {
        "NaN" => f64::NAN,
        "inf" => f64::INFINITY,
        "-inf" => f64::NEG_INFINITY,
        other => {
            return Err(Error::Serialization(format!(
                "metadata value for '{key}': unknown float '{other}'"
            )))
        }
    };
    Ok(MetaValue::Float(x))
}

/// JSON object of an envelope.
///
/// # Errors
/// Returns [`Error::InvalidInput`] if the caller used the reserved key
pub fn metadata_to_value(metadata: &Metadata) -> Result<Value> {
    if metadata.get(ORIGIN_SHAPE_KEY).is_some() {
        return Err(Error::InvalidInput(format!(
            "metadata key '{ORIGIN_SHAPE_KEY}' is reserved"
        )));
    }
    let mut object = Map::with_capacity(metadata.len() + 1);
    for (key, value) in metadata.values() {
        object.insert(key.clone(), scalar_to_value(value)?);
    }
    if let Some(shape) = metadata.origin_shape() {
        object.insert(
            ORIGIN_SHAPE_KEY.to_string(),
            Value::String(shape.as_str().to_string()),
        );
    }
    Ok(Value::Object(object))
}

/// Envelope from a JSON object.
///
/// # Errors
/// Returns [`Error::Serialization`] if the value is not an object of scalars
pub fn metadata_from_value(value: Value) -> Result<Metadata> {
    let Value::Object(object) = value else {
        return Err(Error::Serialization(
            "metadata must be a JSON object".to_string(),
        ));
    };
    let mut metadata = Metadata::new();
    for (key, value) in object {
        if key == ORIGIN_SHAPE_KEY {
            let shape = value.as_str().ok_or_else(|| {
                Error::Serialization(format!("'{ORIGIN_SHAPE_KEY}' must be text"))
            })?;
            metadata.set_origin_shape(Some(Shape::parse(shape)?));
            continue;
        }
        if let Value::Object(inner) = &value {
            let x = non_finite_from_value(&key, inner)?;
            metadata.insert(key, x);
            continue;
        }
        if value.is_array() {
            return Err(Error::Serialization(format!(
                "metadata value for '{key}' is not a scalar"
            )));
        }
        let scalar: MetaValue = serde_json::from_value(value)
            .map_err(|e| Error::Serialization(format!("metadata value for '{key}': {e}")))?;
        metadata.insert(key, scalar);
    }
    Ok(metadata)
}

/// Encode an envelope as indented JSON text.
///
/// # Errors
/// See [`metadata_to_value`]
pub fn encode_metadata(metadata: &Metadata) -> Result<String> {
    Ok(serde_json::to_string_pretty(&metadata_to_value(metadata)?)?)
}

/// Decode an envelope from JSON text.
///
/// # Errors
/// Returns [`Error::Serialization`] on malformed text or non-scalar values
pub fn decode_metadata(text: &str) -> Result<Metadata> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::Serialization(format!("metadata is not JSON: {e}")))?;
    metadata_from_value(value)
}
