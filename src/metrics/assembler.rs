//! Snapshot assembly from a [`MetricsSource`].

use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, StatsError};
use crate::metrics::data::{ProcessSample, Snapshot};
use crate::metrics::traits::{MetricsSource, ProcessHandle, SourceError};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Mount point whose usage is reported as `diskUsage`.
pub const ROOT_DISK_PATH: &str = "/";

/// Combines the independent reads of a [`MetricsSource`] into one [`Snapshot`].
///
/// Core metrics (CPU, memory, disk, network, the process list call itself) are
/// all-or-nothing: the first failure aborts the snapshot. Per-process fields are
/// best-effort: a process with any unreadable field is left out.
pub struct SnapshotAssembler<S> {
    source: S,
    disk_path: String,
}

impl<S: MetricsSource> SnapshotAssembler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            disk_path: ROOT_DISK_PATH.to_string(),
        }
    }

    /// Report usage of the filesystem at `path` instead of `/`.
    pub fn with_disk_path(mut self, path: impl Into<String>) -> Self {
        self.disk_path = path.into();
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Take one snapshot, blocking the calling thread on the source reads.
    pub fn assemble(&self) -> Result<Snapshot> {
        let cpu = self
            .source
            .read_cpu()
            .map_err(|e| StatsError::metrics_unavailable("CPU stats", e))?;
        let cpu = cpu.first().copied().ok_or_else(|| {
            StatsError::metrics_unavailable(
                "CPU stats",
                SourceError::new("no CPU statistics available"),
            )
        })?;

        let memory = self
            .source
            .read_memory()
            .map_err(|e| StatsError::metrics_unavailable("memory stats", e))?;

        let disk = self
            .source
            .read_disk(&self.disk_path)
            .map_err(|e| StatsError::metrics_unavailable("disk stats", e))?;

        let counters = self
            .source
            .read_network_counters()
            .map_err(|e| StatsError::metrics_unavailable("network stats", e))?;
        let net_traffic = counters.first().map(|c| c.total()).ok_or_else(|| {
            StatsError::metrics_unavailable(
                "network stats",
                SourceError::new("no network statistics available"),
            )
        })?;

        let handles = self
            .source
            .list_processes()
            .map_err(|e| StatsError::metrics_unavailable("process list", e))?;

        let processes = handles
            .iter()
            .filter_map(|handle| match sample_process(handle) {
                Ok(sample) => Some(sample),
                Err(err) => {
                    trace!("Skipping process: {}", err);
                    None
                }
            })
            .collect();

        Ok(Snapshot::new(cpu, memory, disk, net_traffic, processes))
    }

    /// Take one snapshot on the blocking thread pool.
    ///
    /// Source reads may block for a while (sysinfo sleeps between CPU
    /// refreshes), so async callers must not run [`assemble`](Self::assemble)
    /// on a runtime worker.
    pub async fn sample(self: &Arc<Self>) -> Result<Snapshot> {
        let assembler = Arc::clone(self);
        tokio::task::spawn_blocking(move || assembler.assemble()).await?
    }
}

/// Read name, CPU and RSS in that order, stopping at the first failure.
fn sample_process<P: ProcessHandle>(handle: &P) -> Result<ProcessSample> {
    let pid = handle.pid();
    let name = handle
        .name()
        .map_err(|e| StatsError::process_field_unavailable(pid, "name", e))?;
    let cpu_percent = handle
        .cpu_percent()
        .map_err(|e| StatsError::process_field_unavailable(pid, "cpu", e))?;
    let rss = handle
        .memory_rss()
        .map_err(|e| StatsError::process_field_unavailable(pid, "memory", e))?;

    Ok(ProcessSample::new(
        pid,
        name,
        cpu_percent,
        rss as f64 / BYTES_PER_MB,
    ))
}
