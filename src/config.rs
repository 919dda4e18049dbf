// ABOUTME: Client configuration for the telemetry backend and retry behavior
// ABOUTME: Explicit value objects replace environment-global defaults at every call site
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{HistorianError, Result};

/// Default host for the hosted platform
pub const DEFAULT_API_HOST: &str = "api.historian.dev";

/// How the backend exposes datapoint history
///
/// Endpoints differ in capability across deployments, so the mode is a
/// configuration choice, never inferred from response data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// One independent cursor walk per sensor
    #[default]
    PerSensor,
    /// One cursor walk covering all sensors jointly via a comma-joined
    /// sensor parameter and an interleaved cursor
    Batched,
}

/// Connection settings for one telemetry backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Backend host, without scheme (e.g. `api.historian.dev`)
    pub host: String,
    /// Device-scoped access token sent as a bearer credential
    pub token: String,
    /// On-premise deployments speak plain HTTP; hosted ones require TLS
    pub on_prem: bool,
    /// Datapoint endpoint capability for this deployment
    pub mode: RetrievalMode,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.into(),
            token: String::new(),
            on_prem: false,
            mode: RetrievalMode::default(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from `HISTORIAN_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mode = match env::var("HISTORIAN_MODE").as_deref() {
            Ok("batched") => RetrievalMode::Batched,
            _ => RetrievalMode::PerSensor,
        };
        Self {
            host: env::var("HISTORIAN_HOST").unwrap_or_else(|_| DEFAULT_API_HOST.into()),
            token: env::var("HISTORIAN_TOKEN").unwrap_or_default(),
            on_prem: env::var("HISTORIAN_ON_PREM").is_ok_and(|v| v == "1" || v == "true"),
            mode,
        }
    }

    /// Base URL for API calls, honoring an optional per-call on-prem override
    ///
    /// # Errors
    ///
    /// Returns `Config` if the host is empty.
    pub fn base_url(&self, on_prem_override: Option<bool>) -> Result<String> {
        if self.host.is_empty() {
            return Err(HistorianError::Config("empty API host".into()));
        }
        let scheme = if on_prem_override.unwrap_or(self.on_prem) {
            "http"
        } else {
            "https"
        };
        Ok(format!("{scheme}://{}", self.host))
    }
}

/// Bounded-retry policy with tiered backoff
///
/// Early failures wait `short_delay`; once the attempt count passes
/// `long_delay_threshold` the pause stretches to `long_delay`. Passed
/// explicitly wherever retries happen so no process-wide mutable state
/// is involved.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up (first try included)
    pub max_attempts: u32,
    /// Pause after an early failure
    pub short_delay: Duration,
    /// Pause once failures persist past the threshold
    pub long_delay: Duration,
    /// Highest attempt number that still uses the short delay
    pub long_delay_threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            short_delay: Duration::from_millis(1_000),
            long_delay: Duration::from_millis(10_000),
            long_delay_threshold: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never re-attempts
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            short_delay: Duration::from_millis(0),
            long_delay: Duration::from_millis(0),
            long_delay_threshold: 0,
        }
    }

    /// Delay to apply after the given (1-based) failed attempt
    #[must_use]
    pub const fn delay_after(&self, attempt: u32) -> Duration {
        if attempt <= self.long_delay_threshold {
            self.short_delay
        } else {
            self.long_delay
        }
    }
}
