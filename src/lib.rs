// ABOUTME: Main library entry point for the historian telemetry retrieval client
// ABOUTME: Wires the cursor walker, retry controller, normalizer and pivot engine together
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Historian Client
//!
//! Client-side retrieval engine for a time-series IoT platform: given a
//! device and a set of sensors, it pulls historical datapoints from a
//! cursor-paginated backend, resiliently under transient failures, and
//! reshapes the raw per-sensor readings into timestamp-aligned rows.
//!
//! ## Architecture
//!
//! - **Transport**: one HTTP request in, parsed JSON body out (trait seam)
//! - **Retry controller**: bounded attempts with tiered short/long delay
//! - **Cursor walker**: drains a paginated endpoint until the server's
//!   continuation cursor goes falsy
//! - **Orchestrator**: one walk per sensor (or one batched walk), sensor
//!   list defaulted from metadata
//! - **Normalizer**: folds the backend's three raw payload shapes into flat
//!   `{time, sensor, value}` records
//! - **Pivot/clean engine**: filters, calibrates, aliases and pivots flat
//!   records into one row per timestamp
//!
//! ## Example
//!
//! ```rust,no_run
//! use historian_client::client::{HistorianClient, RetrievalParams};
//! use historian_client::config::PlatformConfig;
//!
//! #[tokio::main]
//! async fn main() -> historian_client::errors::Result<()> {
//!     let client = HistorianClient::new(&PlatformConfig::from_env())?;
//!     let params = RetrievalParams::for_device("pump-7")
//!         .with_sensors(["temperature", "rpm"]);
//!     let rows = client.retrieve(&params).await;
//!     println!("{} rows", rows.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod cursor;
pub mod errors;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod normalize;
pub mod pivot;
pub mod retry;
pub mod time;
pub mod transport;

pub use client::{HistorianClient, RetrievalParams};
pub use config::{PlatformConfig, RetrievalMode, RetryPolicy};
pub use errors::{HistorianError, Result};
pub use models::{FlatRecord, Row};
pub use pivot::CleanOptions;
pub use time::TimeInput;
