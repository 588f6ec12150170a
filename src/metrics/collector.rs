//! [`MetricsSource`] implementation backed by sysinfo.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use sysinfo::{Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::metrics::traits::{MetricsSource, NetCounters, ProcessHandle, SourceError};

/// Host metrics read through sysinfo.
///
/// sysinfo computes CPU usage as a delta between two refreshes, so the
/// handles are kept alive across calls and shared by every caller behind
/// mutexes.
pub struct SysinfoSource {
    system: Mutex<CpuTrackedSystem>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
}

struct CpuTrackedSystem {
    system: System,
    last_cpu_refresh: Instant,
}

/// Process fields captured during enumeration.
#[derive(Debug, Clone)]
pub struct SysinfoProcess {
    pid: u32,
    name: String,
    cpu_percent: f32,
    memory_rss: u64,
}

impl SysinfoSource {
    /// Create a new source with an initial refresh of every handle.
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        let mut disks = Disks::new_with_refreshed_list();
        disks.refresh();
        let mut networks = Networks::new_with_refreshed_list();
        networks.refresh();

        Self {
            system: Mutex::new(CpuTrackedSystem {
                system,
                last_cpu_refresh: Instant::now(),
            }),
            disks: Mutex::new(disks),
            networks: Mutex::new(networks),
        }
    }

    fn system(&self) -> Result<MutexGuard<'_, CpuTrackedSystem>, SourceError> {
        self.system
            .lock()
            .map_err(|_| SourceError::new("system handle poisoned"))
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SysinfoSource {
    type Process = SysinfoProcess;

    fn read_cpu(&self) -> Result<Vec<f64>, SourceError> {
        let mut tracked = self.system()?;

        // A refresh closer than the minimum interval to the previous one yields garbage.
        let elapsed = tracked.last_cpu_refresh.elapsed();
        if elapsed < MINIMUM_CPU_UPDATE_INTERVAL {
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - elapsed);
        }
        tracked.system.refresh_cpu_usage();
        tracked.last_cpu_refresh = Instant::now();

        let cpus = tracked.system.cpus();
        if cpus.is_empty() {
            return Ok(Vec::new());
        }
        let usage = cpus.iter().map(|cpu| cpu.cpu_usage() as f64).sum::<f64>() / cpus.len() as f64;
        Ok(vec![usage])
    }

    fn read_memory(&self) -> Result<f64, SourceError> {
        let mut tracked = self.system()?;
        tracked.system.refresh_memory();

        let total = tracked.system.total_memory();
        if total == 0 {
            return Err(SourceError::new("total memory reported as zero"));
        }
        Ok(tracked.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn read_disk(&self, path: &str) -> Result<f64, SourceError> {
        let mut disks = self
            .disks
            .lock()
            .map_err(|_| SourceError::new("disk handle poisoned"))?;
        disks.refresh();

        let disk = disks
            .iter()
            .find(|disk| disk.mount_point() == Path::new(path))
            .ok_or_else(|| SourceError::new(format!("no filesystem mounted at {}", path)))?;

        let total = disk.total_space();
        if total == 0 {
            return Err(SourceError::new(format!("filesystem at {} reports zero size", path)));
        }
        let used = total.saturating_sub(disk.available_space());
        Ok(used as f64 / total as f64 * 100.0)
    }

    fn read_network_counters(&self) -> Result<Vec<NetCounters>, SourceError> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|_| SourceError::new("network handle poisoned"))?;
        networks.refresh();

        if networks.iter().next().is_none() {
            return Ok(Vec::new());
        }

        // One aggregate entry over every interface.
        let total = networks
            .iter()
            .fold(NetCounters::default(), |acc, (_, data)| NetCounters {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
            });
        Ok(vec![total])
    }

    fn list_processes(&self) -> Result<Vec<SysinfoProcess>, SourceError> {
        let mut tracked = self.system()?;
        tracked.system.refresh_all();
        tracked.last_cpu_refresh = Instant::now();

        Ok(tracked
            .system
            .processes()
            .iter()
            .map(|(pid, process)| SysinfoProcess {
                pid: pid.as_u32(),
                name: OsStr::new(process.name()).to_string_lossy().into_owned(),
                cpu_percent: process.cpu_usage(),
                memory_rss: process.memory(),
            })
            .collect())
    }
}

impl ProcessHandle for SysinfoProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> Result<String, SourceError> {
        if self.name.is_empty() {
            return Err(SourceError::new("process name unavailable"));
        }
        Ok(self.name.clone())
    }

    fn cpu_percent(&self) -> Result<f64, SourceError> {
        if !self.cpu_percent.is_finite() {
            return Err(SourceError::new("process cpu usage unavailable"));
        }
        Ok(self.cpu_percent as f64)
    }

    fn memory_rss(&self) -> Result<u64, SourceError> {
        Ok(self.memory_rss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_creation() {
        let source = SysinfoSource::new();
        assert!(source.system().is_ok());
    }

    #[test]
    fn test_cpu_and_memory_in_range() {
        let source = SysinfoSource::new();

        let cpu = source.read_cpu().unwrap();
        if let Some(usage) = cpu.first() {
            assert!((0.0..=100.0).contains(usage), "cpu usage {}", usage);
        }

        let memory = source.read_memory().unwrap();
        assert!((0.0..=100.0).contains(&memory), "memory usage {}", memory);
    }

    #[test]
    fn test_unknown_mount_point_fails() {
        let source = SysinfoSource::new();
        let err = source.read_disk("/definitely/not/a/mount").unwrap_err();
        assert!(err.message().contains("/definitely/not/a/mount"));
    }

    #[test]
    fn test_process_handle_fields() {
        let unnamed = SysinfoProcess {
            pid: 4,
            name: String::new(),
            cpu_percent: 0.0,
            memory_rss: 0,
        };
        assert!(unnamed.name().is_err());

        let broken_cpu = SysinfoProcess {
            pid: 5,
            name: "kworker".to_string(),
            cpu_percent: f32::NAN,
            memory_rss: 4096,
        };
        assert_eq!(broken_cpu.name().unwrap(), "kworker");
        assert!(broken_cpu.cpu_percent().is_err());
        assert_eq!(broken_cpu.memory_rss().unwrap(), 4096);
    }

    #[test]
    fn test_process_list_contains_current_process() {
        let source = SysinfoSource::new();
        let processes = source.list_processes().unwrap();
        let own_pid = std::process::id();
        assert!(processes.iter().any(|p| p.pid() == own_pid));
    }
}
