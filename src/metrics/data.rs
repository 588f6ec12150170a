//! Data structures for sampled host metrics.

use serde::{Deserialize, Serialize};

/// A complete reading of host metrics at one point in time.
///
/// Fields are private so a snapshot cannot be altered once built; every
/// sampling cycle produces a fresh value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Aggregate CPU usage percentage (0.0 to 100.0)
    #[serde(rename = "cpuUsage")]
    cpu_usage_percent: f64,
    /// Memory usage percentage (0.0 to 100.0)
    #[serde(rename = "memUsage")]
    mem_usage_percent: f64,
    /// Root filesystem usage percentage (0.0 to 100.0)
    #[serde(rename = "diskUsage")]
    disk_usage_percent: f64,
    /// Bytes sent plus received since boot
    #[serde(rename = "netTraffic")]
    net_traffic_bytes: u64,
    /// Process table in enumeration order
    processes: Vec<ProcessSample>,
}

/// One fully resolved process entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pid: u32,
    name: String,
    #[serde(rename = "cpuPercent")]
    cpu_percent: f64,
    /// Resident memory in MB
    #[serde(rename = "memoryUsage")]
    memory_usage_mb: f64,
}

impl Snapshot {
    pub fn new(
        cpu_usage_percent: f64,
        mem_usage_percent: f64,
        disk_usage_percent: f64,
        net_traffic_bytes: u64,
        processes: Vec<ProcessSample>,
    ) -> Self {
        Self {
            cpu_usage_percent,
            mem_usage_percent,
            disk_usage_percent,
            net_traffic_bytes,
            processes,
        }
    }

    pub fn cpu_usage_percent(&self) -> f64 {
        self.cpu_usage_percent
    }

    pub fn mem_usage_percent(&self) -> f64 {
        self.mem_usage_percent
    }

    pub fn disk_usage_percent(&self) -> f64 {
        self.disk_usage_percent
    }

    pub fn net_traffic_bytes(&self) -> u64 {
        self.net_traffic_bytes
    }

    pub fn processes(&self) -> &[ProcessSample] {
        &self.processes
    }
}

impl ProcessSample {
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: f64, memory_usage_mb: f64) -> Self {
        Self {
            pid,
            name: name.into(),
            cpu_percent,
            memory_usage_mb,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }

    pub fn memory_usage_mb(&self) -> f64 {
        self.memory_usage_mb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_json_field_names() {
        let snapshot = Snapshot::new(
            12.5,
            40.0,
            70.25,
            1024,
            vec![ProcessSample::new(1, "init", 0.5, 3.0)],
        );
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["cpuUsage"], 12.5);
        assert_eq!(value["memUsage"], 40.0);
        assert_eq!(value["diskUsage"], 70.25);
        assert_eq!(value["netTraffic"], 1024);
        assert_eq!(value["processes"][0]["pid"], 1);
        assert_eq!(value["processes"][0]["name"], "init");
        assert_eq!(value["processes"][0]["cpuPercent"], 0.5);
        assert_eq!(value["processes"][0]["memoryUsage"], 3.0);
        assert!(value.get("cpu_usage_percent").is_none());
    }

    #[test]
    fn test_empty_process_list_serializes_as_array() {
        let snapshot = Snapshot::new(0.0, 0.0, 0.0, 0, Vec::new());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"processes\":[]"));
    }
}
