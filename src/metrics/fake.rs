//! Scripted [`MetricsSource`] for tests and benchmarks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::metrics::traits::{MetricsSource, NetCounters, ProcessHandle, SourceError};

/// A process whose fields are fixed up front.
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pid: u32,
    name: Result<String, SourceError>,
    cpu_percent: Result<f64, SourceError>,
    memory_rss: Result<u64, SourceError>,
    reads: Arc<AtomicUsize>,
}

impl FakeProcess {
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: f64, memory_rss: u64) -> Self {
        Self {
            pid,
            name: Ok(name.into()),
            cpu_percent: Ok(cpu_percent),
            memory_rss: Ok(memory_rss),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_name_error(mut self, msg: impl Into<String>) -> Self {
        self.name = Err(SourceError::new(msg));
        self
    }

    pub fn with_cpu_error(mut self, msg: impl Into<String>) -> Self {
        self.cpu_percent = Err(SourceError::new(msg));
        self
    }

    pub fn with_memory_error(mut self, msg: impl Into<String>) -> Self {
        self.memory_rss = Err(SourceError::new(msg));
        self
    }

    fn read<T: Clone>(&self, field: &Result<T, SourceError>) -> Result<T, SourceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        field.clone()
    }
}

impl ProcessHandle for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> Result<String, SourceError> {
        self.read(&self.name)
    }

    fn cpu_percent(&self) -> Result<f64, SourceError> {
        self.read(&self.cpu_percent)
    }

    fn memory_rss(&self) -> Result<u64, SourceError> {
        self.read(&self.memory_rss)
    }
}

/// A [`MetricsSource`] returning scripted readings.
///
/// [`FakeSource::healthy`] yields CPU 12.3%, memory 55%, disk 80%, 100 bytes
/// sent / 200 received, and one 2 MB process `x` with pid 10. Builder methods
/// replace individual readings, including with failures.
#[derive(Debug)]
pub struct FakeSource {
    cpu: Result<Vec<f64>, SourceError>,
    memory: Result<f64, SourceError>,
    disk: Result<f64, SourceError>,
    network: Result<Vec<NetCounters>, SourceError>,
    processes: Result<Vec<FakeProcess>, SourceError>,
    read_delay: Option<Duration>,
    samples: AtomicUsize,
    field_reads: Arc<AtomicUsize>,
    last_disk_path: Mutex<Option<String>>,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::healthy()
    }
}

impl FakeSource {
    pub fn healthy() -> Self {
        Self {
            cpu: Ok(vec![12.3]),
            memory: Ok(55.0),
            disk: Ok(80.0),
            network: Ok(vec![NetCounters::new(100, 200)]),
            processes: Ok(vec![FakeProcess::new(10, "x", 1.0, 2_097_152)]),
            read_delay: None,
            samples: AtomicUsize::new(0),
            field_reads: Arc::new(AtomicUsize::new(0)),
            last_disk_path: Mutex::new(None),
        }
    }

    pub fn with_cpu(mut self, cpu: Result<Vec<f64>, SourceError>) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn with_cpu_error(self, msg: impl Into<String>) -> Self {
        self.with_cpu(Err(SourceError::new(msg)))
    }

    pub fn with_memory_error(mut self, msg: impl Into<String>) -> Self {
        self.memory = Err(SourceError::new(msg));
        self
    }

    pub fn with_disk_error(mut self, msg: impl Into<String>) -> Self {
        self.disk = Err(SourceError::new(msg));
        self
    }

    pub fn with_network(mut self, network: Result<Vec<NetCounters>, SourceError>) -> Self {
        self.network = network;
        self
    }

    pub fn with_network_error(self, msg: impl Into<String>) -> Self {
        self.with_network(Err(SourceError::new(msg)))
    }

    pub fn with_processes(mut self, processes: Vec<FakeProcess>) -> Self {
        self.processes = Ok(processes);
        self
    }

    pub fn with_process_list_error(mut self, msg: impl Into<String>) -> Self {
        self.processes = Err(SourceError::new(msg));
        self
    }

    /// Block every CPU read for `delay`, like a slow OS call.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Number of CPU reads so far, i.e. how many snapshots were attempted.
    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::Relaxed)
    }

    /// Number of per-process field reads across all enumerated processes.
    pub fn process_field_reads(&self) -> usize {
        self.field_reads.load(Ordering::Relaxed)
    }

    pub fn last_disk_path(&self) -> Option<String> {
        self.last_disk_path
            .lock()
            .ok()
            .and_then(|path| path.clone())
    }
}

impl MetricsSource for FakeSource {
    type Process = FakeProcess;

    fn read_cpu(&self) -> Result<Vec<f64>, SourceError> {
        self.samples.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
        self.cpu.clone()
    }

    fn read_memory(&self) -> Result<f64, SourceError> {
        self.memory.clone()
    }

    fn read_disk(&self, path: &str) -> Result<f64, SourceError> {
        if let Ok(mut last) = self.last_disk_path.lock() {
            *last = Some(path.to_string());
        }
        self.disk.clone()
    }

    fn read_network_counters(&self) -> Result<Vec<NetCounters>, SourceError> {
        self.network.clone()
    }

    fn list_processes(&self) -> Result<Vec<FakeProcess>, SourceError> {
        let processes = self.processes.clone()?;
        Ok(processes
            .into_iter()
            .map(|mut process| {
                process.reads = Arc::clone(&self.field_reads);
                process
            })
            .collect())
    }
}
