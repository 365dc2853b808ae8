//! Basic usage: store a head series, a stress and a model, then read them back
//!
//! The backend is chosen from a JSON configuration, passed as the first
//! argument or defaulting to a flat-file store in a scratch directory.
//!
//! Run with: cargo run --example basic_usage
//!           cargo run --example basic_usage -- '{"type":"document","name":"demo","connstr":":memory:"}'

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use hydrostore::diagnostics::init_logging;
use hydrostore::{
    Connector, ConnectorConfig, Metadata, ModelRecord, ModelValue, Parameter, ParameterTable,
    TimeSeries,
};

fn main() -> anyhow::Result<()> {
    init_logging();
    println!("=== hydrostore basic usage ===\n");

    let scratch = std::env::temp_dir().join("hydrostore_demo");
    let config = match std::env::args().nth(1) {
        Some(json) => ConnectorConfig::from_json(&json)?,
        None => ConnectorConfig::Pas {
            name: "demo".to_string(),
            path: scratch,
        },
    };
    let mut conn = config
        .connect()
        .with_context(|| format!("connecting with {config:?}"))?;
    println!("Connected: {} ({})\n", conn.name(), conn.conn_type());

    let t0 = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("valid start date")?;
    let head = TimeSeries::from_pairs([(t0, 1.0), (t0 + Duration::hours(1), f64::NAN)]);
    let meta = Metadata::new().with("x", 100.0).with("y", 200.0);
    conn.add_oseries(&head, "well_A", Some(&meta), true)?;

    let index: Vec<_> = (0..5).map(|i| t0 + Duration::days(i)).collect();
    let prec = TimeSeries::series(index, vec![0.0, 2.1, 0.4, 0.0, 5.3])?;
    conn.add_stress(&prec, "prec_A", Some("prec"), None, true)?;

    let mut parameters = ParameterTable::new();
    parameters.push(Parameter::new("recharge_A", "recharge", 500.0).bounds(1e-5, 1e4))?;
    let mut model = ModelRecord::new("ml_well_A");
    model.insert("oseries", ModelValue::Series(head.clone()));
    model.insert("parameters", ModelValue::Parameters(parameters));
    conn.add_model(&model, true)?;

    println!("oseries:  {:?}", conn.oseries_names()?);
    println!("stresses: {:?}", conn.stresses_names()?);
    println!("models:   {:?}\n", conn.model_names()?);

    let back = conn.get_oseries("well_A")?;
    println!("well_A == stored: {}", back == head);
    println!("well_A metadata:  {:?}", conn.get_oseries_metadata("well_A")?.values());
    println!("prec_A kind:      {:?}", conn.get_stress_metadata("prec_A")?.get("kind"));
    println!("ml_well_A intact: {}", conn.get_model("ml_well_A")? == model);

    conn.del_oseries("well_A")?;
    match conn.get_oseries("well_A") {
        Err(e) if e.is_not_found() => println!("\nAfter delete: {e}"),
        other => anyhow::bail!("expected NotFound, got {other:?}"),
    }

    hydrostore::util::delete_connector_storage(conn, None)?;
    println!("Storage removed");
    Ok(())
}
