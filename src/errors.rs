// ABOUTME: Unified error type for the historian client retrieval pipeline
// ABOUTME: Distinguishes pre-flight validation failures from transient transport faults
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HistorianError>;

/// Unified error type for retrieval operations
///
/// Validation variants (`InvalidTimeRange`, `InvalidTimeUnit`, `InvalidTimeInput`,
/// `DeviceNotFound`, `NoSensorData`) are raised before any datapoint request is
/// issued and are never retried. Transport and application variants are
/// transient: the retry controller re-attempts them up to its configured bound
/// and wraps the final failure in `RetryExhausted`.
#[derive(Debug, Error)]
pub enum HistorianError {
    /// Requested range has its start after its end
    #[error("invalid time range: start {start_ms} is after end {end_ms}")]
    InvalidTimeRange {
        /// Range start, epoch milliseconds
        start_ms: i64,
        /// Range end, epoch milliseconds
        end_ms: i64,
    },

    /// A seconds-resolution timestamp was supplied where milliseconds are required
    #[error("time value {value} has 10 or fewer digits; epoch milliseconds required")]
    InvalidTimeUnit {
        /// The rejected value
        value: i64,
    },

    /// A caller-supplied time string could not be parsed
    #[error("unparseable time input: {0}")]
    InvalidTimeInput(String),

    /// Device id is absent from the account's device list
    #[error("device {device_id} not found in account device list")]
    DeviceNotFound {
        /// The unknown device id
        device_id: String,
    },

    /// The resolved sensor list for a device is empty
    #[error("device {device_id} has no sensors to retrieve")]
    NoSensorData {
        /// Device whose sensor list resolved empty
        device_id: String,
    },

    /// Transport failure persisted past the retry bound
    #[error("retries exhausted after {attempts} attempts")]
    RetryExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last underlying failure
        #[source]
        source: Box<HistorianError>,
    },

    /// Backend returned a recognized but unusable payload shape
    #[error("malformed response from backend: {detail}")]
    MalformedResponse {
        /// What was wrong with the payload
        detail: String,
    },

    /// Backend returned a non-2xx status
    #[error("backend returned status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        message: String,
    },

    /// Request could not be sent or the response body could not be read
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Backend reported an application-level failure inside a 2xx response
    /// (a `success: false` or `errors` field)
    #[error("backend reported failure: {message}")]
    ApplicationFailure {
        /// Server-supplied error description
        message: String,
    },

    /// Client configuration is unusable (bad base URL, empty token)
    #[error("configuration error: {0}")]
    Config(String),
}

impl HistorianError {
    /// Whether this failure is worth re-attempting
    ///
    /// Validation and configuration errors are deterministic and excluded;
    /// only transport-level and server-reported failures qualify.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Api { .. }
                | Self::Network(_)
                | Self::ApplicationFailure { .. }
                | Self::MalformedResponse { .. }
        )
    }

    /// Build a `MalformedResponse` from anything displayable
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            detail: detail.into(),
        }
    }
}
