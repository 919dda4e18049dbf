// ABOUTME: Tests for the pivot/clean engine: aliasing, calibration, time formats, flat mode
// ABOUTME: Complements the unit tests covering grouping and filtering
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use historian_client::models::FlatRecord;
use historian_client::pivot::{clean, Calibrator, CleanOptions};

fn record(time: i64, sensor: &str, value: Value, device: Option<&str>) -> FlatRecord {
    FlatRecord {
        time,
        sensor: sensor.into(),
        value,
        device_id: device.map(Into::into),
    }
}

#[test]
fn test_pivot_example_from_contract() {
    // [{t1,"A",5},{t1,"B",7},{t2,"A",9}] pivots to two rows, no B on the second.
    let records = vec![
        record(1, "A", json!(5), None),
        record(1, "B", json!(7), None),
        record(2, "A", json!(9), None),
    ];
    let rows = clean(
        &records,
        &CleanOptions {
            to_unix_time: true,
            ..CleanOptions::pivoted()
        },
    );

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("timestamp"), Some(&json!(1)));
    assert_eq!(rows[0].get("A"), Some(&json!(5)));
    assert_eq!(rows[0].get("B"), Some(&json!(7)));
    assert_eq!(rows[1].get("A"), Some(&json!(9)));
    assert!(!rows[1].contains_key("B"));
}

#[test]
fn test_iso_timestamps_by_default() {
    let records = vec![record(1_700_000_000_000, "temp", json!(1), None)];
    let rows = clean(&records, &CleanOptions::pivoted());
    assert_eq!(
        rows[0].get("timestamp"),
        Some(&json!("2023-11-14T22:13:20.000Z"))
    );
}

#[test]
fn test_alias_renames_mapped_fields_only() {
    let records = vec![
        record(1, "temp", json!(1), None),
        record(1, "rpm", json!(2), None),
    ];
    let options = CleanOptions {
        alias: Some(HashMap::from([
            ("temp".to_owned(), "temperature_c".to_owned()),
            ("timestamp".to_owned(), "ts".to_owned()),
        ])),
        to_unix_time: true,
        ..CleanOptions::pivoted()
    };
    let rows = clean(&records, &options);

    assert!(rows[0].contains_key("temperature_c"));
    assert!(rows[0].contains_key("ts"));
    // Unmapped names pass through unchanged.
    assert!(rows[0].contains_key("rpm"));
    assert!(!rows[0].contains_key("temp"));
}

#[test]
fn test_flat_mode_preserves_record_order() {
    let records = vec![
        record(2, "b", json!(1), Some("d1")),
        record(1, "a", json!(2), Some("d1")),
    ];
    let rows = clean(
        &records,
        &CleanOptions {
            pivot: false,
            to_unix_time: true,
            ..CleanOptions::default()
        },
    );

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("sensor"), Some(&json!("b")));
    assert_eq!(rows[0].get("time"), Some(&json!(2)));
    assert_eq!(rows[1].get("sensor"), Some(&json!("a")));
    assert_eq!(rows[0].get("device"), Some(&json!("d1")));
}

#[test]
fn test_device_filter_drops_other_devices() {
    let records = vec![
        record(1, "temp", json!(1), Some("keep")),
        record(1, "temp", json!(2), Some("drop")),
        record(1, "temp", json!(3), None),
    ];
    let rows = clean(
        &records,
        &CleanOptions {
            device_filter: Some("keep".into()),
            pivot: false,
            to_unix_time: true,
            ..CleanOptions::default()
        },
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("value"), Some(&json!(1)));
}

struct DoubleTemp;

impl Calibrator for DoubleTemp {
    fn calibrate(&self, sensor: &str, value: &Value) -> Value {
        match (sensor, value.as_f64()) {
            ("temp", Some(v)) => json!(v * 2.0),
            _ => value.clone(),
        }
    }
}

#[test]
fn test_calibration_hook_applies_per_sensor() {
    let records = vec![
        record(1, "temp", json!(10.0), None),
        record(1, "rpm", json!(100.0), None),
    ];
    let rows = clean(
        &records,
        &CleanOptions {
            calibration: Some(Arc::new(DoubleTemp)),
            to_unix_time: true,
            ..CleanOptions::pivoted()
        },
    );
    assert_eq!(rows[0].get("temp"), Some(&json!(20.0)));
    assert_eq!(rows[0].get("rpm"), Some(&json!(100.0)));
}
