//! Model record <-> JSON text
//!
//! Plain scalars, lists and maps map onto their JSON counterparts, keeping
//! key order. Domain substructures become single-key tagged objects:
//!
//! | value                   | wire form                                              |
//! |-------------------------|--------------------------------------------------------|
//! | timestamp               | `{"$timestamp": "2020-01-01T00:00:00"}`                |
//! | numeric array           | `{"$array": [1.0, null]}`                              |
//! | series                  | `{"$series": {"shape": "series", "data": {...}}}`      |
//! | parameter table         | `{"$parameters": {"columns": [..], "index": [..], "data": [[..]]}}` |
//! | NaN / infinite float    | `{"$float": "NaN"}`                                    |
//! | map with one `$` key    | `{"$map": {...}}`                                      |

use serde_json::{Map, Value};

use super::series::{
    format_timestamp, number_or_nan, number_or_null, parse_timestamp, series_from_value,
    series_to_value,
};
use crate::model::{ModelRecord, ModelValue, Parameter, ParameterTable};
use crate::series::Shape;
use crate::{Error, Result};

const TAG_TIMESTAMP: &str = "$timestamp";
const TAG_ARRAY: &str = "$array";
const TAG_SERIES: &str = "$series";
const TAG_PARAMETERS: &str = "$parameters";
const TAG_FLOAT: &str = "$float";
const TAG_MAP: &str = "$map";

/// Column order of a parameter table on the wire
const PARAMETER_COLUMNS: [&str; 7] = ["initial", "pmin", "pmax", "vary", "name", "optimal", "stderr"];

/// Column name used for a bare series embedded in a model
const SERIES_COLUMN: &str = "values";

fn tagged(tag: &str, value: Value) -> Value {
    let mut object = Map::with_capacity(1);
    object.insert(tag.to_string(), value);
    Value::Object(object)
}

fn float_to_value(x: f64) -> Value {
    if x.is_finite() {
        number_or_null(x)
    } else {
        let repr = if x.is_nan() {
            "NaN"
        } else if x > 0.0 {
            "inf"
        } else {
            "-inf"
        };
        tagged(TAG_FLOAT, Value::String(repr.to_string()))
    }
}

fn entries_to_object(entries: &[(String, ModelValue)]) -> Result<Map<String, Value>> {
    let mut object = Map::with_capacity(entries.len());
    for (key, value) in entries {
        if object.insert(key.clone(), value_to_json(value)?).is_some() {
            return Err(Error::Serialization(format!("duplicate key '{key}'")));
        }
    }
    Ok(object)
}

fn parameters_to_value(table: &ParameterTable) -> Value {
    let index: Vec<Value> = table.iter().map(|p| Value::String(p.name.clone())).collect();
    let data: Vec<Value> = table
        .iter()
        .map(|p| {
            Value::Array(vec![
                number_or_null(p.initial),
                number_or_null(p.pmin),
                number_or_null(p.pmax),
                Value::Bool(p.vary),
                Value::String(p.group.clone()),
                number_or_null(p.optimal),
                number_or_null(p.stderr),
            ])
        })
        .collect();
    let columns = PARAMETER_COLUMNS
        .iter()
        .map(|c| Value::String((*c).to_string()))
        .collect();

    let mut object = Map::with_capacity(3);
    object.insert("columns".to_string(), Value::Array(columns));
    object.insert("index".to_string(), Value::Array(index));
    object.insert("data".to_string(), Value::Array(data));
    tagged(TAG_PARAMETERS, Value::Object(object))
}

/// JSON value of a single model value.
///
/// # Errors
/// Returns [`Error::Serialization`] for embedded series that cannot be
/// represented (duplicate timestamps) and for mappings with a repeated key
pub fn value_to_json(value: &ModelValue) -> Result<Value> {
    Ok(match value {
        ModelValue::Null => Value::Null,
        ModelValue::Bool(b) => Value::Bool(*b),
        ModelValue::Int(i) => Value::from(*i),
        ModelValue::Float(x) => float_to_value(*x),
        ModelValue::Str(s) => Value::String(s.clone()),
        ModelValue::Timestamp(ts) => tagged(TAG_TIMESTAMP, Value::String(format_timestamp(ts))),
        ModelValue::Array(xs) => tagged(
            TAG_ARRAY,
            Value::Array(xs.iter().copied().map(number_or_null).collect()),
        ),
        ModelValue::Series(series) => {
            let mut object = Map::with_capacity(2);
            object.insert(
                "shape".to_string(),
                Value::String(series.shape().as_str().to_string()),
            );
            object.insert("data".to_string(), series_to_value(series, SERIES_COLUMN)?);
            tagged(TAG_SERIES, Value::Object(object))
        }
        ModelValue::Parameters(table) => parameters_to_value(table),
        ModelValue::List(items) => {
            Value::Array(items.iter().map(value_to_json).collect::<Result<_>>()?)
        }
        ModelValue::Map(entries) => {
            let object = entries_to_object(entries)?;
            let needs_escape = object.len() == 1 && object.keys().all(|k| k.starts_with('$'));
            if needs_escape {
                tagged(TAG_MAP, Value::Object(object))
            } else {
                Value::Object(object)
            }
        }
    })
}

fn field<'a>(object: &'a Map<String, Value>, key: &str, context: &str) -> Result<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| Error::Serialization(format!("{context}: missing '{key}'")))
}

fn as_text<'a>(value: &'a Value, context: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::Serialization(format!("{context}: expected text")))
}

fn as_array<'a>(value: &'a Value, context: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::Serialization(format!("{context}: expected array")))
}

fn parameters_from_value(value: &Value) -> Result<ParameterTable> {
    let Value::Object(object) = value else {
        return Err(Error::Serialization("parameters must be an object".to_string()));
    };
    let columns: Vec<&str> = as_array(field(object, "columns", "parameters")?, "parameters")?
        .iter()
        .map(|c| as_text(c, "parameter column"))
        .collect::<Result<_>>()?;
    if columns != PARAMETER_COLUMNS {
        return Err(Error::Serialization(format!(
            "unexpected parameter columns {columns:?}"
        )));
    }
    let index = as_array(field(object, "index", "parameters")?, "parameters")?;
    let data = as_array(field(object, "data", "parameters")?, "parameters")?;
    if index.len() != data.len() {
        return Err(Error::Serialization(
            "parameter index and data differ in length".to_string(),
        ));
    }

    let mut table = ParameterTable::new();
    for (name, row) in index.iter().zip(data) {
        let name = as_text(name, "parameter name")?;
        let row = as_array(row, name)?;
        if row.len() != PARAMETER_COLUMNS.len() {
            return Err(Error::Serialization(format!(
                "parameter '{name}' has {} fields",
                row.len()
            )));
        }
        let vary = row[3]
            .as_bool()
            .ok_or_else(|| Error::Serialization(format!("parameter '{name}': vary must be bool")))?;
        table
            .push(Parameter {
                name: name.to_string(),
                initial: number_or_nan(&row[0], name)?,
                pmin: number_or_nan(&row[1], name)?,
                pmax: number_or_nan(&row[2], name)?,
                vary,
                group: as_text(&row[4], name)?.to_string(),
                optimal: number_or_nan(&row[5], name)?,
                stderr: number_or_nan(&row[6], name)?,
            })
            .map_err(|e| Error::Serialization(e.to_string()))?;
    }
    Ok(table)
}

fn float_from_value(value: &Value) -> Result<f64> {
    match as_text(value, TAG_FLOAT)? {
        "NaN" => Ok(f64::NAN),
        "inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        other => Err(Error::Serialization(format!("unknown float '{other}'"))),
    }
}

fn decode_tagged(tag: &str, inner: &Value) -> Result<Option<ModelValue>> {
    let value = match tag {
        TAG_TIMESTAMP => ModelValue::Timestamp(parse_timestamp(as_text(inner, tag)?)?),
        TAG_ARRAY => ModelValue::Array(
            as_array(inner, tag)?
                .iter()
                .map(|x| number_or_nan(x, tag))
                .collect::<Result<_>>()?,
        ),
        TAG_SERIES => {
            let Value::Object(object) = inner else {
                return Err(Error::Serialization("series must be an object".to_string()));
            };
            let shape = Shape::parse(as_text(field(object, "shape", tag)?, tag)?)?;
            let frame = series_from_value(field(object, "data", tag)?)?;
            ModelValue::Series(frame.with_shape(shape))
        }
        TAG_PARAMETERS => ModelValue::Parameters(parameters_from_value(inner)?),
        TAG_FLOAT => ModelValue::Float(float_from_value(inner)?),
        TAG_MAP => {
            let Value::Object(object) = inner else {
                return Err(Error::Serialization("escaped map must be an object".to_string()));
            };
            ModelValue::Map(object_to_entries(object)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn object_to_entries(object: &Map<String, Value>) -> Result<Vec<(String, ModelValue)>> {
    object
        .iter()
        .map(|(k, v)| Ok((k.clone(), value_from_json(v)?)))
        .collect()
}

/// Model value from its JSON form.
///
/// # Errors
/// Returns [`Error::Serialization`] on malformed tagged substructures
pub fn value_from_json(value: &Value) -> Result<ModelValue> {
    Ok(match value {
        Value::Null => ModelValue::Null,
        Value::Bool(b) => ModelValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ModelValue::Int(i),
            None => ModelValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => ModelValue::Str(s.clone()),
        Value::Array(items) => {
            ModelValue::List(items.iter().map(value_from_json).collect::<Result<_>>()?)
        }
        Value::Object(object) => {
            if object.len() == 1 {
                if let Some((tag, inner)) = object.iter().next() {
                    if let Some(decoded) = decode_tagged(tag, inner)? {
                        return Ok(decoded);
                    }
                }
            }
            ModelValue::Map(object_to_entries(object)?)
        }
    })
}

/// Encode a model record as indented JSON text.
///
/// # Errors
/// See [`value_to_json`]
pub fn encode_model(model: &ModelRecord) -> Result<String> {
    let object = entries_to_object(model.entries())?;
    Ok(serde_json::to_string_pretty(&Value::Object(object))?)
}

/// Decode a model record from JSON text.
///
/// # Errors
/// Returns [`Error::Serialization`] on malformed text, a non-object root or a
/// missing `name`
pub fn decode_model(text: &str) -> Result<ModelRecord> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::Serialization(format!("model payload is not JSON: {e}")))?;
    let Value::Object(object) = value else {
        return Err(Error::Serialization("model root must be an object".to_string()));
    };
    ModelRecord::from_entries(object_to_entries(&object)?)
        .map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::TimeSeries;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn nested_model() -> ModelRecord {
        let head = TimeSeries::series(
            vec![t0(), t0() + Duration::days(1)],
            vec![1.5, f64::NAN],
        )
        .unwrap();
        let mut parameters = ParameterTable::new();
        parameters
            .push(Parameter::new("recharge_A", "recharge", 210.0).bounds(1e-5, 1e4).fitted(650.2, 12.1))
            .unwrap();
        parameters.push(Parameter::new("constant_d", "constant", 0.0)).unwrap();

        let mut ml = ModelRecord::new("well_A");
        ml.insert(
            "settings",
            ModelValue::Map(vec![
                ("tmin".into(), t0().into()),
                ("freq".into(), "D".into()),
                ("noise".into(), true.into()),
            ]),
        );
        ml.insert("oseries", ModelValue::Map(vec![("series".into(), head.into())]));
        ml.insert(
            "stressmodels",
            ModelValue::Map(vec![(
                "recharge".into(),
                ModelValue::Map(vec![(
                    "rfunc".into(),
                    ModelValue::Map(vec![
                        ("up".into(), true.into()),
                        ("cutoff".into(), 0.999.into()),
                        ("gain".into(), vec![1.0, f64::NAN, -3.0].into()),
                    ]),
                )]),
            )]),
        );
        ml.insert("parameters", parameters);
        ml.insert("fit_stats", ModelValue::List(vec![f64::INFINITY.into(), 3_i64.into()]));
        ml.insert("z", ModelValue::Map(vec![("$literal".into(), ModelValue::Null)]));
        ml
    }

    #[test]
    fn test_nested_model_round_trip() {
        let ml = nested_model();
        let text = encode_model(&ml).unwrap();
        let back = decode_model(&text).unwrap();
        assert_eq!(back, ml);
    }

    #[test]
    fn test_key_order_preserved() {
        let ml = nested_model();
        let back = decode_model(&encode_model(&ml).unwrap()).unwrap();
        let keys: Vec<_> = back.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["name", "settings", "oseries", "stressmodels", "parameters", "fit_stats", "z"]
        );
    }

    #[test]
    fn test_dollar_key_map_is_escaped() {
        let value = ModelValue::Map(vec![("$timestamp".into(), "not a date".into())]);
        let json = value_to_json(&value).unwrap();
        assert!(json.get(TAG_MAP).is_some());
        assert_eq!(value_from_json(&json).unwrap(), value);
    }

    #[test]
    fn test_integral_float_stays_float() {
        let json = value_to_json(&ModelValue::Float(2.0)).unwrap();
        let text = serde_json::to_string(&json).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value_from_json(&back).unwrap(), ModelValue::Float(2.0));
    }

    #[test]
    fn test_repeated_nested_key_rejected() {
        let mut ml = ModelRecord::new("m");
        ml.insert(
            "settings",
            ModelValue::Map(vec![("a".into(), 1_i64.into()), ("a".into(), 2_i64.into())]),
        );
        let err = encode_model(&ml).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().contains("duplicate key 'a'"));
    }

    #[test]
    fn test_missing_name_is_serialization_error() {
        let err = decode_model(r#"{"settings": {}}"#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_malformed_parameters_rejected() {
        let text = r#"{"name": "m", "p": {"$parameters": {"columns": ["a"], "index": [], "data": []}}}"#;
        assert!(matches!(decode_model(text), Err(Error::Serialization(_))));
    }
}
