// ABOUTME: Metadata lookups for the account's devices and per-device sensor lists
// ABOUTME: One-shot GETs behind a trait seam; the core only calls these to default inputs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{HistorianError, Result};
use crate::models::{Device, Sensor};
use crate::transport::{Transport, TransportRequest};

/// Device and sensor metadata for the account
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// All devices visible to the account's token
    async fn get_devices(&self) -> Result<Vec<Device>>;

    /// Sensors attached to one device
    async fn get_sensors(&self, device_id: &str) -> Result<Vec<Sensor>>;
}

/// Metadata provider backed by the HTTP transport
pub struct HttpMetadataProvider {
    transport: Arc<dyn Transport>,
}

impl HttpMetadataProvider {
    /// Wrap a transport
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(body: Value, what: &str) -> Result<Vec<T>> {
    // Metadata endpoints wrap their list in a data field on some deployments
    // and return it bare on others.
    let list = match body {
        Value::Object(mut object) => object
            .remove("data")
            .ok_or_else(|| HistorianError::malformed(format!("{what} response has no data field")))?,
        other => other,
    };
    serde_json::from_value(list)
        .map_err(|e| HistorianError::malformed(format!("undecodable {what} list: {e}")))
}

#[async_trait]
impl MetadataProvider for HttpMetadataProvider {
    async fn get_devices(&self) -> Result<Vec<Device>> {
        let body = self
            .transport
            .request(&TransportRequest::get("/api/v1/devices", Vec::new()))
            .await?;
        decode_list(body, "device")
    }

    async fn get_sensors(&self, device_id: &str) -> Result<Vec<Sensor>> {
        let path = format!("/api/v1/devices/{device_id}/sensors");
        let body = self
            .transport
            .request(&TransportRequest::get(path, Vec::new()))
            .await?;
        decode_list(body, "sensor")
    }
}
