//! # host_stats - Linux host telemetry over pull and push channels
//!
//! Reads CPU, memory, temperature, network, disk, battery, load and container
//! metrics from a host's `/proc`, `/sys` and `/etc` trees (usually mounted into
//! a container under `/host/*`) and serves them to dashboard clients.
//!
//! Data is split in two:
//!
//! - **Static snapshot**: hostname, platform, arch, kernel and CPU model. Pulled
//!   once over HTTP from `/api/static`.
//! - **Dynamic snapshot**: everything that changes. Pushed over a WebSocket on
//!   `/` once when the connection opens and then whenever the client sends
//!   `{"type":"requestDynamic"}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use host_stats::{start_web_server, CollectorConfig, HostCollector, WebConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let collector = HostCollector::new(CollectorConfig::default());
//!     start_web_server(WebConfig::default(), Arc::new(collector)).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod metrics;
pub mod web;

// Re-export public API
pub use client::{watch, DashboardSession, WatchConfig};
pub use error::{Result, SystemError};
pub use metrics::{
    collector::HostCollector,
    config::{CollectorConfig, DiskDevice},
    data::{DynamicSnapshot, StaticSnapshot},
    traits::{CommandRunner, SnapshotSource},
};
pub use web::{start_web_server, AppState, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// The default gap between the two `/proc/stat` samples, in milliseconds
pub const DEFAULT_CPU_SAMPLE_MS: u64 = 250;

/// How long a client waits before reopening a closed push channel
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// How often a client asks for a fresh dynamic snapshot
pub const DEFAULT_REFRESH_MS: u64 = 5000;
