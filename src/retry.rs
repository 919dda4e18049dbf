// ABOUTME: Bounded-retry controller with tiered backoff for transport operations
// ABOUTME: Re-attempts transient failures only, one warn line per failed attempt
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::future::Future;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::errors::{HistorianError, Result};

/// Run an operation with bounded retries and tiered delay
///
/// The operation is attempted up to `policy.max_attempts` times. Failures
/// that are not transient (validation, configuration) are returned
/// immediately without a retry. Each failed attempt logs one warn line;
/// between attempts the controller sleeps for the policy's short delay,
/// stretching to the long delay once the attempt count passes the
/// threshold. No other state is touched.
///
/// # Errors
///
/// Returns the operation's own error for non-transient failures, or
/// `RetryExhausted` carrying the last underlying error once the attempt
/// bound is reached.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                attempt += 1;
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "retrieval attempt failed"
                );
                if attempt >= policy.max_attempts {
                    return Err(HistorianError::RetryExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                tokio::time::sleep(policy.delay_after(attempt)).await;
            }
        }
    }
}
