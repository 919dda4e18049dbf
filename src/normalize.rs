// ABOUTME: Normalization of heterogeneous raw datapoint payloads into flat records
// ABOUTME: Shape detection happens once at the boundary; unrecognized shapes degrade to empty
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::models::FlatRecord;

/// The raw payload shapes backends are known to emit
///
/// Detected once per payload; each variant has its own pure conversion.
#[derive(Debug)]
enum RawShape<'a> {
    /// Array of `{time, sensor, value}` records
    Records(&'a [Value]),
    /// Object keyed by sensor id, each value an array of `{time, value}`
    KeyedSeries(&'a Map<String, Value>),
    /// Object keyed by sensor id, each value a single `{time, value}` reading
    KeyedSingle(&'a Map<String, Value>),
    /// Anything else: treated as "no data", not an error
    Unrecognized,
}

fn detect(payload: &Value) -> RawShape<'_> {
    match payload {
        Value::Array(records) => RawShape::Records(records),
        Value::Object(keyed) => {
            // One array value anywhere means the per-sensor series form;
            // all-object values mean the single-reading form.
            if keyed.values().any(Value::is_array) {
                RawShape::KeyedSeries(keyed)
            } else if !keyed.is_empty() && keyed.values().all(Value::is_object) {
                RawShape::KeyedSingle(keyed)
            } else {
                RawShape::Unrecognized
            }
        }
        _ => RawShape::Unrecognized,
    }
}

/// Coerce a raw `time` field into epoch milliseconds
///
/// Payload timestamps are already millisecond-resolution numbers or ISO
/// strings; a reading whose timestamp cannot be read is dropped by the
/// caller rather than failing the batch.
fn coerce_time(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .ok(),
        _ => None,
    }
}

fn record_from_parts(time: Option<&Value>, sensor: &str, value: Option<&Value>) -> Option<FlatRecord> {
    Some(FlatRecord {
        time: coerce_time(time)?,
        sensor: sensor.to_owned(),
        value: value.cloned()?,
        device_id: None,
    })
}

fn from_record_array(records: &[Value]) -> Vec<FlatRecord> {
    records
        .iter()
        .filter_map(|record| {
            let object = record.as_object()?;
            let sensor = object
                .get("sensor")
                .or_else(|| object.get("variable"))
                .and_then(Value::as_str)?;
            let mut flat = record_from_parts(
                object.get("time").or_else(|| object.get("timestamp")),
                sensor,
                object.get("value"),
            )?;
            flat.device_id = object
                .get("device")
                .or_else(|| object.get("device_id"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned);
            Some(flat)
        })
        .collect()
}

fn from_keyed_series(keyed: &Map<String, Value>) -> Vec<FlatRecord> {
    keyed
        .iter()
        .filter_map(|(sensor, series)| Some((sensor, series.as_array()?)))
        .flat_map(|(sensor, series)| {
            series.iter().filter_map(move |reading| {
                let object = reading.as_object()?;
                record_from_parts(object.get("time"), sensor, object.get("value"))
            })
        })
        .collect()
}

fn from_keyed_single(keyed: &Map<String, Value>) -> Vec<FlatRecord> {
    keyed
        .iter()
        .filter_map(|(sensor, reading)| {
            let object = reading.as_object()?;
            record_from_parts(object.get("time"), sensor, object.get("value"))
        })
        .collect()
}

/// Convert one raw payload into flat records
///
/// Polymorphic over the three known raw shapes; any other shape yields an
/// empty list so a single malformed sensor block does not abort an
/// otherwise successful batch. Individual readings missing a usable time
/// or value are skipped for the same reason.
#[must_use]
pub fn normalize(payload: &Value) -> Vec<FlatRecord> {
    match detect(payload) {
        RawShape::Records(records) => from_record_array(records),
        RawShape::KeyedSeries(keyed) => from_keyed_series(keyed),
        RawShape::KeyedSingle(keyed) => from_keyed_single(keyed),
        RawShape::Unrecognized => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unrecognized_shapes_yield_empty() {
        assert!(normalize(&json!(null)).is_empty());
        assert!(normalize(&json!("datapoints")).is_empty());
        assert!(normalize(&json!(42)).is_empty());
        assert!(normalize(&json!({ "sensor_a": 7 })).is_empty());
    }

    #[test]
    fn test_reading_without_time_is_skipped() {
        let payload = json!([
            { "sensor": "temp", "value": 20.5 },
            { "time": 1_700_000_000_000_i64, "sensor": "temp", "value": 21.0 }
        ]);
        let records = normalize(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, json!(21.0));
    }

    #[test]
    fn test_iso_payload_times_coerced() {
        let payload = json!({ "temp": [{ "time": "2023-11-14T22:13:20Z", "value": 1 }] });
        let records = normalize(&payload);
        assert_eq!(records[0].time, 1_700_000_000_000);
    }

    #[test]
    fn test_device_id_carried_from_record_array() {
        let payload = json!([
            { "time": 1_700_000_000_000_i64, "sensor": "rpm", "value": 900, "device": "pump-1" }
        ]);
        assert_eq!(normalize(&payload)[0].device_id.as_deref(), Some("pump-1"));
    }
}
