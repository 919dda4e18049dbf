// ABOUTME: Shared test utilities: scripted transport/metadata mocks and page builders
// ABOUTME: Tests drive the pipeline through its trait seams, no sockets involved
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use serde_json::{json, Value};

use historian_client::errors::{HistorianError, Result};
use historian_client::metadata::MetadataProvider;
use historian_client::models::{Device, Sensor};
use historian_client::transport::{Transport, TransportRequest};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

/// Transport mock that replays a scripted sequence of responses
///
/// Once the script runs out, every further request fails with an
/// application failure, which conveniently models an endlessly failing
/// backend for retry-exhaustion tests.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        init_test_logging();
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Transport that fails every request
    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, request: &TransportRequest) -> Result<Value> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(HistorianError::ApplicationFailure {
                    message: "scripted responses exhausted".into(),
                })
            })
    }
}

/// Metadata mock backed by in-memory device and sensor tables
pub struct ScriptedMetadata {
    devices: Vec<Device>,
    sensors: HashMap<String, Vec<Sensor>>,
}

impl ScriptedMetadata {
    pub fn new(devices: Vec<(&str, Vec<&str>)>) -> Self {
        let sensors = devices
            .iter()
            .map(|(device, names)| {
                let list = names
                    .iter()
                    .map(|name| Sensor {
                        id: (*name).to_owned(),
                        name: None,
                        unit: None,
                    })
                    .collect();
                ((*device).to_owned(), list)
            })
            .collect();
        let devices = devices
            .into_iter()
            .map(|(device, _)| Device {
                id: device.to_owned(),
                name: None,
            })
            .collect();
        Self { devices, sensors }
    }
}

#[async_trait]
impl MetadataProvider for ScriptedMetadata {
    async fn get_devices(&self) -> Result<Vec<Device>> {
        Ok(self.devices.clone())
    }

    async fn get_sensors(&self, device_id: &str) -> Result<Vec<Sensor>> {
        Ok(self.sensors.get(device_id).cloned().unwrap_or_default())
    }
}

/// Build one page body with an optional continuation cursor
pub fn page(records: Value, cursor: Option<Value>) -> Result<Value> {
    let mut body = json!({ "success": true, "data": records });
    if let Some(cursor) = cursor {
        body.as_object_mut()
            .unwrap()
            .insert("cursor".into(), cursor);
    }
    Ok(body)
}

/// A `{time, value}` reading for per-sensor payloads
pub fn reading(time_ms: i64, value: f64) -> Value {
    json!({ "time": time_ms, "value": value })
}
