// ABOUTME: Cursor walker that drains a paginated datapoint endpoint to exhaustion
// ABOUTME: Server-issued continuation cursors are advanced until a terminal field goes falsy
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::pin::Pin;

use async_stream::try_stream;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::RetryPolicy;
use crate::errors::{HistorianError, Result};
use crate::retry::with_retry;
use crate::transport::{Transport, TransportRequest};

/// Opaque continuation state issued by the server
///
/// The walker never interprets the fields beyond checking for exhaustion;
/// they are echoed back verbatim as query parameters on the next page
/// request. Created and consumed within a single walk, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Position field; also carries the initial anchor timestamp
    #[serde(default)]
    pub start: Option<i64>,
    /// Upper bound of the remaining window (device-time-range form)
    #[serde(default)]
    pub end: Option<i64>,
    /// Page size (per-sensor form)
    #[serde(default)]
    pub limit: Option<i64>,
}

fn usable(field: Option<i64>) -> bool {
    field.is_some_and(|v| v != 0)
}

impl Cursor {
    /// Cursor for the per-sensor form: anchor at a timestamp, page by limit
    #[must_use]
    pub const fn anchored(start: i64, limit: i64) -> Self {
        Self {
            start: Some(start),
            end: None,
            limit: Some(limit),
        }
    }

    /// Cursor for the device-time-range form
    #[must_use]
    pub const fn ranged(start: i64, end: i64, limit: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            limit: Some(limit),
        }
    }

    /// Whether pagination is finished
    ///
    /// A walk continues only while `start` plus at least one of
    /// `limit`/`end` are present and non-zero; anything else is the
    /// server's exhaustion signal.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        !(usable(self.start) && (usable(self.limit) || usable(self.end)))
    }

    /// Render the cursor fields as query parameters
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(start) = self.start {
            params.push(("start".into(), start.to_string()));
        }
        if let Some(end) = self.end {
            params.push(("end".into(), end.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        params
    }
}

/// One successfully parsed page
#[derive(Debug, Clone)]
pub struct CursorPage {
    /// Raw datapoints carried by this page
    pub records: Vec<Value>,
    /// Continuation for the next page, absent on the final one
    pub next_cursor: Option<Cursor>,
}

/// Interpret one response body as a page
///
/// An application-level failure inside a 2xx body (`success: false` or a
/// non-null `errors` field) is an operation failure eligible for retry,
/// not a terminal success.
///
/// # Errors
///
/// Returns `ApplicationFailure` for server-reported failures and
/// `MalformedResponse` when the body is not an object or carries an
/// undecodable cursor.
pub fn parse_page(body: &Value) -> Result<CursorPage> {
    let object = body
        .as_object()
        .ok_or_else(|| HistorianError::malformed("page body is not a JSON object"))?;

    if object.get("success").and_then(Value::as_bool) == Some(false) {
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("success=false")
            .to_owned();
        return Err(HistorianError::ApplicationFailure { message });
    }
    if let Some(errors) = object.get("errors") {
        if !errors.is_null() {
            return Err(HistorianError::ApplicationFailure {
                message: errors.to_string(),
            });
        }
    }

    let records = object
        .get("data")
        .or_else(|| object.get("results"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let next_cursor = match object.get("cursor") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            serde_json::from_value::<Cursor>(raw.clone())
                .map_err(|e| HistorianError::malformed(format!("undecodable cursor: {e}")))?,
        ),
    };

    Ok(CursorPage {
        records,
        next_cursor,
    })
}

fn page_request(template: &TransportRequest, cursor: &Cursor) -> TransportRequest {
    let mut request = template.clone();
    request.query.extend(cursor.query_params());
    request
}

/// Drain the endpoint described by `template`, accumulating every page
///
/// Each iteration issues the template request plus the current cursor's
/// fields through the retry controller, collects the page's data array,
/// and advances to the server-supplied next cursor. Pages arrive strictly
/// in cursor order. Retry exhaustion mid-walk fails the whole walk.
///
/// # Errors
///
/// Propagates `RetryExhausted` (and non-transient failures) from any page
/// fetch.
pub async fn walk(
    transport: &dyn Transport,
    policy: &RetryPolicy,
    template: &TransportRequest,
    initial: Cursor,
) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    let mut cursor = initial;
    let mut pages: u32 = 0;

    while !cursor.is_exhausted() {
        let request = page_request(template, &cursor);
        let page = with_retry(policy, || async {
            let body = transport.request(&request).await?;
            parse_page(&body)
        })
        .await?;

        pages += 1;
        records.extend(page.records);
        cursor = page.next_cursor.unwrap_or_default();
    }

    debug!(pages, records = records.len(), path = %template.path, "cursor walk complete");
    Ok(records)
}

/// Lazy variant of [`walk`]: yields one page of raw datapoints at a time
///
/// Useful for large histories where buffering everything is undesirable.
/// The stream is finite and non-restartable; dropping it abandons the
/// walk.
pub fn page_stream<'a>(
    transport: &'a dyn Transport,
    policy: &'a RetryPolicy,
    template: &'a TransportRequest,
    initial: Cursor,
) -> Pin<Box<dyn Stream<Item = Result<Vec<Value>>> + Send + 'a>> {
    Box::pin(try_stream! {
        let mut cursor = initial;
        while !cursor.is_exhausted() {
            let request = page_request(template, &cursor);
            let page = with_retry(policy, || async {
                let body = transport.request(&request).await?;
                parse_page(&body)
            })
            .await?;
            cursor = page.next_cursor.unwrap_or_default();
            yield page.records;
        }
    })
}
