//! Property-based tests for hydrostore
//!
//! - Codec round trips are exact (NaN, signed zero, extreme magnitudes)
//! - Shapes survive every wire form
//! - Connectors return what was stored
//! - Run with ProptestConfig::with_cases(64)

use chrono::{Duration, NaiveDate, NaiveDateTime};
use hydrostore::codec::columnar::{batches_to_series, series_to_batch};
use hydrostore::codec::{decode_metadata, decode_model, decode_series, encode_metadata, encode_model, encode_series};
use hydrostore::util::{check_item_name, validate_name};
use hydrostore::{
    Connector, Library, MemoryConnector, MetaValue, Metadata, ModelRecord, ModelValue,
    PasConnector, Shape, TimeSeries,
};
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Any f64 the series columns must carry, NaN and infinities excluded from
/// JSON payloads only when non-finite (those are stored as null / NaN).
fn arb_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => -1e6f64..1e6,
        1 => Just(0.0),
        1 => Just(-0.0),
        1 => Just(f64::NAN),
        1 => prop::num::f64::NORMAL,
    ]
}

/// Strictly increasing timestamps with nanosecond offsets
fn arb_index(max_len: usize) -> impl Strategy<Value = Vec<NaiveDateTime>> {
    prop::collection::vec(1i64..10_000_000_000_000, 0..max_len).prop_map(|steps| {
        let mut t = NaiveDate::from_ymd_opt(1990, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        steps
            .into_iter()
            .map(|step| {
                t += Duration::nanoseconds(step);
                t
            })
            .collect()
    })
}

fn arb_series() -> impl Strategy<Value = TimeSeries> {
    arb_index(40).prop_flat_map(|index| {
        let n = index.len();
        prop::collection::vec(arb_value(), n)
            .prop_map(move |values| TimeSeries::series(index.clone(), values).unwrap())
    })
}

fn arb_frame() -> impl Strategy<Value = TimeSeries> {
    (arb_index(20), 1usize..4).prop_flat_map(|(index, n_cols)| {
        let n = index.len();
        prop::collection::vec(prop::collection::vec(arb_value(), n), n_cols).prop_map(
            move |columns| {
                let columns = columns
                    .into_iter()
                    .enumerate()
                    .map(|(i, values)| (format!("col_{i}"), values))
                    .collect();
                TimeSeries::frame(index.clone(), columns).unwrap()
            },
        )
    })
}

fn arb_item_series() -> impl Strategy<Value = TimeSeries> {
    prop_oneof![arb_series(), arb_frame()]
}

fn arb_meta_value() -> impl Strategy<Value = MetaValue> {
    prop_oneof![
        Just(MetaValue::Null),
        any::<bool>().prop_map(MetaValue::Bool),
        any::<i64>().prop_map(MetaValue::Int),
        (-1e9f64..1e9).prop_map(MetaValue::Float),
        prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY)]
            .prop_map(MetaValue::Float),
        "[a-zA-Z0-9 _.-]{0,12}".prop_map(MetaValue::Str),
    ]
}

fn arb_metadata() -> impl Strategy<Value = Metadata> {
    prop::collection::btree_map("[a-z][a-z0-9_]{0,8}", arb_meta_value(), 0..6)
        .prop_map(|values| values.into_iter().collect())
}

fn arb_model_value() -> impl Strategy<Value = ModelValue> {
    let leaf = prop_oneof![
        Just(ModelValue::Null),
        any::<bool>().prop_map(ModelValue::Bool),
        any::<i64>().prop_map(ModelValue::Int),
        arb_value().prop_map(ModelValue::Float),
        Just(ModelValue::Float(f64::NEG_INFINITY)),
        "[a-z$]{0,6}".prop_map(ModelValue::Str),
        prop::collection::vec(arb_value(), 0..5).prop_map(ModelValue::Array),
        arb_series().prop_map(ModelValue::Series),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(ModelValue::List),
            prop::collection::btree_map("[a-z$][a-z]{0,5}", inner, 0..4)
                .prop_map(|m| ModelValue::Map(m.into_iter().collect())),
        ]
    })
}

fn arb_model() -> impl Strategy<Value = ModelRecord> {
    ("[a-z]{1,8}", prop::collection::btree_map("[a-z]{1,6}", arb_model_value(), 0..5)).prop_map(
        |(name, entries)| {
            let mut model = ModelRecord::new(name);
            for (key, value) in entries {
                model.insert(key, value);
            }
            model
        },
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: JSON series payload restores values, index and shape
    #[test]
    fn prop_series_json_round_trip(series in arb_item_series()) {
        let text = encode_series(&series, "s").unwrap();
        let back = decode_series(&text, Some(series.shape())).unwrap();
        prop_assert_eq!(back, series);
    }

    /// Property: Without a recorded shape a payload always reads as a frame
    #[test]
    fn prop_series_without_shape_is_frame(series in arb_series()) {
        let text = encode_series(&series, "s").unwrap();
        let back = decode_series(&text, None).unwrap();
        prop_assert_eq!(back.shape(), Shape::Frame);
        prop_assert_eq!(back.with_shape(Shape::Series), series);
    }

    /// Property: Arrow batches preserve every column exactly
    #[test]
    fn prop_series_batch_round_trip(series in arb_item_series()) {
        let batch = series_to_batch(&series, "s").unwrap();
        prop_assert_eq!(batch.num_rows(), series.len());
        let back = batches_to_series(&[batch]).unwrap().with_shape(series.shape());
        prop_assert_eq!(back, series);
    }

    /// Property: Envelopes round-trip and hide the shape key
    #[test]
    fn prop_metadata_round_trip(meta in arb_metadata(), bare in any::<bool>()) {
        let shape = if bare { Shape::Series } else { Shape::Frame };
        let meta = meta.with_origin_shape(shape);
        let back = decode_metadata(&encode_metadata(&meta).unwrap()).unwrap();
        prop_assert!(back.get("_origin_shape").is_none());
        prop_assert_eq!(back, meta);
    }

    /// Property: Models round-trip structurally, key order included
    #[test]
    fn prop_model_round_trip(model in arb_model()) {
        let back = decode_model(&encode_model(&model).unwrap()).unwrap();
        let keys: Vec<_> = back.entries().iter().map(|(k, _)| k.clone()).collect();
        let expected: Vec<_> = model.entries().iter().map(|(k, _)| k.clone()).collect();
        prop_assert_eq!(keys, expected);
        prop_assert_eq!(back, model);
    }

    /// Property: Sanitized names are always accepted by every library
    #[test]
    fn prop_validated_names_accepted(raw in "[ -~]{1,20}") {
        let name = validate_name(&raw);
        prop_assume!(!name.is_empty() && name != "." && name != ".." && !name.ends_with("_meta"));
        prop_assert!(check_item_name(Library::Oseries, &name).is_ok());
        prop_assert!(check_item_name(Library::Models, &name).is_ok());
    }

    /// Property: Memory connector lists exactly the stored names, in order
    #[test]
    fn prop_memory_listing_complete(names in prop::collection::btree_set("[a-z]{1,8}", 0..12)) {
        let mut conn = MemoryConnector::new("prop");
        let series = TimeSeries::series(Vec::new(), Vec::new()).unwrap();
        for name in &names {
            conn.add_oseries(&series, name, None, false).unwrap();
        }
        let listed = conn.oseries_names().unwrap();
        prop_assert_eq!(listed, names.iter().cloned().collect::<Vec<_>>());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: Flat-file connector returns stored series and metadata
    #[test]
    fn prop_pas_round_trip(series in arb_item_series(), meta in arb_metadata()) {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = PasConnector::new("prop", dir.path()).unwrap();
        conn.add_oseries(&series, "item", Some(&meta), false).unwrap();

        prop_assert_eq!(conn.get_oseries("item").unwrap(), series);
        prop_assert_eq!(conn.get_oseries_metadata("item").unwrap(), meta);
    }
}
