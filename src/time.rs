// ABOUTME: Coercion of caller-supplied time inputs into epoch milliseconds
// ABOUTME: Rejects seconds-resolution values and validates range ordering before any request
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{HistorianError, Result};

/// Largest positive integer that still fits in 10 digits
///
/// Epoch values at or below this are seconds, not milliseconds; supplying one
/// where milliseconds are expected silently shifts a query back to 1970, so
/// they are rejected outright.
pub const MAX_SECONDS_LIKE_EPOCH: i64 = 9_999_999_999;

/// A caller-supplied point in time, prior to coercion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    /// Absolute epoch milliseconds
    EpochMs(i64),
    /// ISO-8601 / RFC 3339 timestamp string
    Iso(String),
    /// The current instant
    Now,
}

/// Coerce a time input into epoch milliseconds
///
/// # Errors
///
/// Returns `InvalidTimeUnit` for a positive integer of 10 or fewer digits
/// (a seconds-resolution epoch), or `InvalidTimeInput` for an unparseable
/// ISO string.
pub fn to_epoch_ms(input: &TimeInput) -> Result<i64> {
    match input {
        TimeInput::EpochMs(value) => {
            if *value > 0 && *value <= MAX_SECONDS_LIKE_EPOCH {
                return Err(HistorianError::InvalidTimeUnit { value: *value });
            }
            Ok(*value)
        }
        TimeInput::Iso(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.timestamp_millis())
            .map_err(|_| HistorianError::InvalidTimeInput(text.clone())),
        TimeInput::Now => Ok(Utc::now().timestamp_millis()),
    }
}

/// A validated closed time range in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Range start (inclusive)
    pub start_ms: i64,
    /// Range end (inclusive)
    pub end_ms: i64,
}

impl TimeRange {
    /// Build a range, rejecting one whose start is after its end
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimeRange` when `start_ms > end_ms`.
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self> {
        if start_ms > end_ms {
            return Err(HistorianError::InvalidTimeRange { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }
}

/// Render an epoch-milliseconds value as an RFC 3339 string
///
/// Values outside chrono's representable range fall back to the raw number.
#[must_use]
pub fn format_iso(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map_or_else(
        || epoch_ms.to_string(),
        |dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    )
}
