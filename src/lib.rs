//! # sysstats - host resource metrics over HTTP
//!
//! Samples CPU, memory, root filesystem, network counters and the process
//! table, and serves them two ways: a JSON snapshot at `/api/stats` and a
//! Server-Sent Events stream at `/api/events` emitting one snapshot every
//! two seconds.
//!
//! ## Failure policy
//!
//! - A failed core read (CPU, memory, disk, network, process list) fails the
//!   whole snapshot. The snapshot endpoint answers 500; the event stream emits
//!   an `error` event and keeps going.
//! - A process whose name, CPU or memory cannot be read is left out of the
//!   snapshot.
//! - A client that goes away ends its own session only.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sysstats::{start_web_server, SysinfoSource, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WebConfig::from_env()?;
//!     start_web_server(config, SysinfoSource::new(), async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

pub mod error;
pub mod metrics;
pub mod shutdown;
pub mod web;

// Re-export public API
pub use error::{Result, StatsError};
pub use metrics::{
    assembler::SnapshotAssembler,
    collector::SysinfoSource,
    data::{ProcessSample, Snapshot},
    traits::{MetricsSource, NetCounters, ProcessHandle, SourceError},
};
pub use web::{start_web_server, WebConfig, WebServer};

/// The default interval between streamed snapshots in milliseconds
pub const DEFAULT_STREAM_INTERVAL_MS: u64 = 2000;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 3000;

/// How long shutdown waits for open connections
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
