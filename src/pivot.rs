// ABOUTME: Pivot/clean engine reshaping flat records into per-timestamp rows
// ABOUTME: Filters, calibrates, aliases and pivots; pure transformation, no I/O
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::models::{FlatRecord, Row};
use crate::time::format_iso;

/// Per-sensor value adjustment hook (e.g. linear scaling)
///
/// Reserved extension point: without a table installed the transform is the
/// identity.
pub trait Calibrator: Send + Sync {
    /// Adjust one reading for the given sensor
    fn calibrate(&self, sensor: &str, value: &Value) -> Value;
}

/// Options for the pivot/clean stage, validated once at entry
///
/// Every flag is explicit; defaults are pivot on, ISO timestamps, no
/// filtering, no aliasing, identity calibration.
#[derive(Clone, Default)]
pub struct CleanOptions {
    /// Keep only records for these sensors, when set
    pub sensor_filter: Option<HashSet<String>>,
    /// Keep only records from this device, when set
    pub device_filter: Option<String>,
    /// Calibration table; identity when absent
    pub calibration: Option<Arc<dyn Calibrator>>,
    /// Leave timestamps as epoch-millisecond integers instead of ISO strings
    pub to_unix_time: bool,
    /// Replace output field names by their mapped alias
    pub alias: Option<HashMap<String, String>>,
    /// Group records into one row per timestamp (flat list when false)
    pub pivot: bool,
}

impl CleanOptions {
    /// Default options with pivoting enabled
    #[must_use]
    pub fn pivoted() -> Self {
        Self {
            pivot: true,
            ..Self::default()
        }
    }

    fn keeps(&self, record: &FlatRecord) -> bool {
        if let Some(sensors) = &self.sensor_filter {
            if !sensors.contains(&record.sensor) {
                return false;
            }
        }
        if let Some(device) = &self.device_filter {
            if record.device_id.as_deref() != Some(device.as_str()) {
                return false;
            }
        }
        true
    }

    fn calibrated(&self, record: &FlatRecord) -> Value {
        match &self.calibration {
            Some(table) => table.calibrate(&record.sensor, &record.value),
            None => record.value.clone(),
        }
    }

    fn field<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias
            .as_ref()
            .and_then(|map| map.get(name))
            .map_or(name, String::as_str)
    }

    fn time_value(&self, epoch_ms: i64) -> Value {
        if self.to_unix_time {
            Value::from(epoch_ms)
        } else {
            Value::String(format_iso(epoch_ms))
        }
    }
}

impl fmt::Debug for CleanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanOptions")
            .field("sensor_filter", &self.sensor_filter)
            .field("device_filter", &self.device_filter)
            .field("calibration", &self.calibration.is_some())
            .field("to_unix_time", &self.to_unix_time)
            .field("alias", &self.alias)
            .field("pivot", &self.pivot)
            .finish()
    }
}

fn pivot_rows(records: &[FlatRecord], options: &CleanOptions) -> Vec<Row> {
    // Row order follows first-seen timestamp order; sensors absent at a
    // timestamp are simply omitted, never filled.
    let mut rows: Vec<Row> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.time).or_insert_with(|| {
            let mut row = Row::new();
            row.insert(
                options.field("timestamp").to_owned(),
                options.time_value(record.time),
            );
            rows.push(row);
            rows.len() - 1
        });
        rows[slot].insert(
            options.field(&record.sensor).to_owned(),
            options.calibrated(record),
        );
    }
    rows
}

fn flat_rows(records: &[FlatRecord], options: &CleanOptions) -> Vec<Row> {
    records
        .iter()
        .map(|record| {
            let mut row = Row::new();
            row.insert(
                options.field("time").to_owned(),
                options.time_value(record.time),
            );
            row.insert(
                options.field("sensor").to_owned(),
                Value::String(record.sensor.clone()),
            );
            row.insert(options.field("value").to_owned(), options.calibrated(record));
            if let Some(device_id) = &record.device_id {
                row.insert(
                    options.field("device").to_owned(),
                    Value::String(device_id.clone()),
                );
            }
            row
        })
        .collect()
}

/// Filter, calibrate, alias and (optionally) pivot flat records into rows
///
/// With pivoting enabled this emits one row per distinct timestamp with one
/// column per sensor present at that instant; otherwise the filtered and
/// aliased records come back flat, order unchanged. Cannot fail: malformed
/// input to this stage is programmer error upstream, not a runtime path.
#[must_use]
pub fn clean(records: &[FlatRecord], options: &CleanOptions) -> Vec<Row> {
    let kept: Vec<FlatRecord> = records
        .iter()
        .filter(|record| options.keeps(record))
        .cloned()
        .collect();

    if options.pivot {
        pivot_rows(&kept, options)
    } else {
        flat_rows(&kept, options)
    }
}
