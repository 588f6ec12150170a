//! Host metrics sampling.
//!
//! This module provides the [`MetricsSource`] seam over OS introspection, the
//! sysinfo-backed implementation, and the [`SnapshotAssembler`] that turns
//! independent reads into one immutable [`Snapshot`].

pub mod assembler;
pub mod collector;
pub mod data;
pub mod fake;
pub mod traits;

// Re-export commonly used items
pub use assembler::SnapshotAssembler;
pub use collector::SysinfoSource;
pub use data::{ProcessSample, Snapshot};
pub use traits::{MetricsSource, NetCounters, ProcessHandle, SourceError};
