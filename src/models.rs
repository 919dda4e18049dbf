// ABOUTME: Shared domain models returned across the retrieval pipeline
// ABOUTME: Devices and sensors from metadata lookups, flat records from normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A device registered in the account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Backend device identifier
    pub id: String,
    /// Human-readable label, if the backend supplies one
    #[serde(default)]
    pub name: Option<String>,
}

/// A sensor attached to a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    /// Backend sensor identifier
    pub id: String,
    /// Human-readable label
    #[serde(default)]
    pub name: Option<String>,
    /// Measurement unit, if declared
    #[serde(default)]
    pub unit: Option<String>,
}

/// One normalized datapoint: a single sensor reading at a single instant
///
/// Transient form produced by the normalizer and consumed by the pivot/clean
/// engine; never returned to callers directly unless pivoting is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    /// Reading timestamp, epoch milliseconds
    pub time: i64,
    /// Sensor the reading belongs to
    pub sensor: String,
    /// Reading value; backends mix numbers and strings freely
    pub value: Value,
    /// Originating device, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// One output row: either a pivoted per-timestamp row
/// (`{timestamp, sensorA: v, sensorB: v}`) or, with pivoting disabled, a
/// flat record rendered as an object. Field names may have been aliased.
pub type Row = serde_json::Map<String, Value>;
