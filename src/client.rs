// ABOUTME: Multi-sensor retrieval orchestrator tying validation, walks and cleaning together
// ABOUTME: Top-level boundary converts every surfaced error into an empty result plus a log line
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info};

use crate::config::{PlatformConfig, RetrievalMode, RetryPolicy};
use crate::cursor::{self, parse_page, Cursor};
use crate::errors::{HistorianError, Result};
use crate::metadata::{HttpMetadataProvider, MetadataProvider};
use crate::models::{FlatRecord, Row};
use crate::normalize::normalize;
use crate::pivot::{clean, CleanOptions};
use crate::retry::with_retry;
use crate::time::{to_epoch_ms, TimeInput, TimeRange};
use crate::transport::{HttpTransport, Transport, TransportRequest};

/// Page size used when the caller does not specify one
pub const DEFAULT_PAGE_LIMIT: i64 = 1_000;

/// One retrieval call's inputs
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    /// Device whose history to pull
    pub device_id: String,
    /// Sensors to retrieve; empty resolves the device's full sensor list
    pub sensors: Vec<String>,
    /// Range start; defaults to the epoch
    pub start_time: Option<TimeInput>,
    /// Range end; defaults to now
    pub end_time: Option<TimeInput>,
    /// Page size per cursor step
    pub limit: Option<i64>,
    /// Override the client's configured retrieval mode for this call
    pub mode: Option<RetrievalMode>,
    /// Pivot/clean options applied to the normalized records
    pub clean: CleanOptions,
}

impl RetrievalParams {
    /// Parameters for a full-history retrieval of one device
    #[must_use]
    pub fn for_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            sensors: Vec::new(),
            start_time: None,
            end_time: None,
            limit: None,
            mode: None,
            clean: CleanOptions::pivoted(),
        }
    }

    /// Restrict the call to the given sensors
    #[must_use]
    pub fn with_sensors<I, S>(mut self, sensors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensors = sensors.into_iter().map(Into::into).collect();
        self
    }

    /// Bound the call to a time window
    #[must_use]
    pub fn with_window(mut self, start: TimeInput, end: TimeInput) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }
}

/// Client-side retrieval engine for historical sensor telemetry
///
/// Owns no shared mutable state: each call allocates its own cursors, retry
/// counters and accumulation buffers, so concurrent top-level calls are
/// fully independent. Within one call, per-sensor walks run one at a time
/// to bound outstanding requests against the backend.
pub struct HistorianClient {
    transport: Arc<dyn Transport>,
    metadata: Arc<dyn MetadataProvider>,
    retry: RetryPolicy,
    mode: RetrievalMode,
}

impl HistorianClient {
    /// Build a client over the production HTTP transport
    ///
    /// # Errors
    ///
    /// Returns `Config` when the platform configuration does not form a
    /// usable base URL.
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        Self::with_on_prem_override(config, None)
    }

    /// Build a client with a per-deployment on-prem scheme override
    ///
    /// # Errors
    ///
    /// Returns `Config` when the platform configuration does not form a
    /// usable base URL.
    pub fn with_on_prem_override(
        config: &PlatformConfig,
        on_prem_override: Option<bool>,
    ) -> Result<Self> {
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(config, on_prem_override)?);
        let metadata = Arc::new(HttpMetadataProvider::new(Arc::clone(&transport)));
        Ok(Self::with_collaborators(
            transport,
            metadata,
            RetryPolicy::default(),
            config.mode,
        ))
    }

    /// Build a client from explicit collaborators (used heavily by tests)
    #[must_use]
    pub fn with_collaborators(
        transport: Arc<dyn Transport>,
        metadata: Arc<dyn MetadataProvider>,
        retry: RetryPolicy,
        mode: RetrievalMode,
    ) -> Self {
        Self {
            transport,
            metadata,
            retry,
            mode,
        }
    }

    /// Retrieve and reshape datapoints, degrading every failure to empty
    ///
    /// This is the compatibility contract inherited from the platform's
    /// client: on any surfaced error the call logs one error line and
    /// resolves to an empty list, so callers cannot distinguish "no data"
    /// from "failed after retries" here. Use [`Self::try_retrieve`] for
    /// the typed variant.
    pub async fn retrieve(&self, params: &RetrievalParams) -> Vec<Row> {
        match self.try_retrieve(params).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(device_id = %params.device_id, error = %err, "retrieval failed");
                Vec::new()
            }
        }
    }

    /// Retrieve and reshape datapoints, surfacing failures as errors
    ///
    /// # Errors
    ///
    /// Validation errors (`InvalidTimeRange`, `InvalidTimeUnit`,
    /// `DeviceNotFound`, `NoSensorData`) short-circuit before any datapoint
    /// request; transport failures surface as `RetryExhausted` once the
    /// retry bound is hit on any sensor's walk.
    pub async fn try_retrieve(&self, params: &RetrievalParams) -> Result<Vec<Row>> {
        let started = Instant::now();

        let end_ms = to_epoch_ms(params.end_time.as_ref().unwrap_or(&TimeInput::Now))?;
        let start_ms = match &params.start_time {
            Some(input) => to_epoch_ms(input)?,
            None => 0,
        };
        let range = TimeRange::new(start_ms, end_ms)?;
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let mode = params.mode.unwrap_or(self.mode);

        let sensors = self.resolve_sensors(params).await?;
        info!(
            device_id = %params.device_id,
            sensors = sensors.len(),
            ?mode,
            start_ms = range.start_ms,
            end_ms = range.end_ms,
            "retrieving datapoints"
        );

        let mut records = match mode {
            RetrievalMode::PerSensor => {
                self.walk_per_sensor(&params.device_id, &sensors, &range, limit)
                    .await?
            }
            RetrievalMode::Batched => {
                self.walk_batched(&params.device_id, &sensors, &range, limit)
                    .await?
            }
        };
        for record in &mut records {
            if record.device_id.is_none() {
                record.device_id = Some(params.device_id.clone());
            }
        }

        let rows = clean(&records, &params.clean);
        info!(
            device_id = %params.device_id,
            records = records.len(),
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(rows)
    }

    /// Latest reading for one sensor, degrading failure to an empty row
    ///
    /// The aggregate counterpart of [`Self::retrieve`]: an empty object
    /// means "possibly failed, check logs".
    pub async fn retrieve_latest(&self, device_id: &str, sensor: &str) -> Row {
        match self.try_retrieve_latest(device_id, sensor).await {
            Ok(row) => row,
            Err(err) => {
                error!(device_id, sensor, error = %err, "latest-value retrieval failed");
                Row::new()
            }
        }
    }

    /// Latest reading for one sensor as a single pivoted row
    ///
    /// # Errors
    ///
    /// Surfaces transport failures as `RetryExhausted`.
    pub async fn try_retrieve_latest(&self, device_id: &str, sensor: &str) -> Result<Row> {
        let template = TransportRequest::get(
            datapoint_path(device_id, Some(sensor)),
            vec![("limit".into(), "1".into())],
        );
        let page = with_retry(&self.retry, || async {
            let body = self.transport.request(&template).await?;
            parse_page(&body)
        })
        .await?;

        let records = normalize(&keyed_payload(sensor, page.records));
        let rows = clean(&records, &CleanOptions::pivoted());
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn resolve_sensors(&self, params: &RetrievalParams) -> Result<Vec<String>> {
        if !params.sensors.is_empty() {
            return Ok(params.sensors.clone());
        }

        let devices = self.metadata.get_devices().await?;
        if !devices.iter().any(|d| d.id == params.device_id) {
            return Err(HistorianError::DeviceNotFound {
                device_id: params.device_id.clone(),
            });
        }

        let sensors = self.metadata.get_sensors(&params.device_id).await?;
        if sensors.is_empty() {
            return Err(HistorianError::NoSensorData {
                device_id: params.device_id.clone(),
            });
        }
        Ok(sensors.into_iter().map(|s| s.id).collect())
    }

    async fn walk_per_sensor(
        &self,
        device_id: &str,
        sensors: &[String],
        range: &TimeRange,
        limit: i64,
    ) -> Result<Vec<FlatRecord>> {
        let mut records = Vec::new();
        for sensor in sensors {
            let template =
                TransportRequest::get(datapoint_path(device_id, Some(sensor)), Vec::new());
            let initial = Cursor::anchored(range.end_ms, limit);
            let raw = cursor::walk(self.transport.as_ref(), &self.retry, &template, initial)
                .await?;
            // Wrap the sensor's readings in the keyed shape so normalization
            // tags each one with the sensor id.
            records.extend(normalize(&keyed_payload(sensor, raw)));
        }
        Ok(records)
    }

    async fn walk_batched(
        &self,
        device_id: &str,
        sensors: &[String],
        range: &TimeRange,
        limit: i64,
    ) -> Result<Vec<FlatRecord>> {
        let template = TransportRequest::get(
            datapoint_path(device_id, None),
            vec![("sensors".into(), sensors.join(","))],
        );
        // A zero start would read as an already-exhausted cursor.
        let initial = Cursor::ranged(range.start_ms.max(1), range.end_ms, limit);
        let raw = cursor::walk(self.transport.as_ref(), &self.retry, &template, initial).await?;
        Ok(normalize(&Value::Array(raw)))
    }
}

fn keyed_payload(sensor: &str, readings: Vec<Value>) -> Value {
    let mut keyed = serde_json::Map::new();
    keyed.insert(sensor.to_owned(), Value::Array(readings));
    Value::Object(keyed)
}

fn datapoint_path(device_id: &str, sensor: Option<&str>) -> String {
    match sensor {
        Some(sensor) => format!("/api/v1/devices/{device_id}/sensors/{sensor}/datapoints"),
        None => format!("/api/v1/devices/{device_id}/datapoints"),
    }
}
