//! Traits for reading host metrics.
//!
//! [`MetricsSource`] is the seam between the sampling pipeline and whatever
//! actually talks to the operating system. Every read is independent and may
//! fail on its own; the policy for combining those failures lives in
//! [`SnapshotAssembler`](crate::metrics::assembler::SnapshotAssembler), not here.

/// Failure reported by a [`MetricsSource`] read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SourceError {
    message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One network I/O counter entry, cumulative since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl NetCounters {
    pub fn new(bytes_sent: u64, bytes_recv: u64) -> Self {
        Self {
            bytes_sent,
            bytes_recv,
        }
    }

    /// Bytes sent plus bytes received.
    pub fn total(&self) -> u64 {
        self.bytes_sent.saturating_add(self.bytes_recv)
    }
}

/// A process observed during enumeration.
///
/// The pid is always known; the other fields are read lazily and each may fail.
pub trait ProcessHandle {
    fn pid(&self) -> u32;

    fn name(&self) -> Result<String, SourceError>;

    /// CPU utilization of this process in percent.
    fn cpu_percent(&self) -> Result<f64, SourceError>;

    /// Resident set size in bytes.
    fn memory_rss(&self) -> Result<u64, SourceError>;
}

/// Read-only access to host metrics.
///
/// Implementations must be safe to call from several sessions at once. Calls
/// may block; async callers should go through
/// [`SnapshotAssembler::sample`](crate::metrics::assembler::SnapshotAssembler::sample).
pub trait MetricsSource: Send + Sync + 'static {
    type Process: ProcessHandle;

    /// Aggregate CPU utilization. An empty vector means no reading was produced.
    fn read_cpu(&self) -> Result<Vec<f64>, SourceError>;

    /// Used memory in percent.
    fn read_memory(&self) -> Result<f64, SourceError>;

    /// Used space of the filesystem mounted at `path`, in percent.
    fn read_disk(&self, path: &str) -> Result<f64, SourceError>;

    fn read_network_counters(&self) -> Result<Vec<NetCounters>, SourceError>;

    fn list_processes(&self) -> Result<Vec<Self::Process>, SourceError>;
}
