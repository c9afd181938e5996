//! Data structures for host metrics.
//!
//! Every type here is part of the JSON wire contract and serializes with
//! camelCase field names. `Default` is the "unavailable" representation of
//! each metric: zeros, `None` or empty lists.

use serde::{Deserialize, Serialize};

/// Rarely-changing identity facts about the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticSnapshot {
    /// Host name from the host's `/etc/hostname`
    pub hostname: String,
    /// Operating system family
    pub platform: String,
    /// CPU architecture (e.g. "x86_64", "aarch64")
    pub arch: String,
    /// Running kernel release
    pub kernel: String,
    /// CPU model and core count
    pub cpu: CpuInfo,
}

/// Time-varying measurements captured in a single pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicSnapshot {
    /// Capture time of this snapshot (Unix timestamp in milliseconds)
    pub timestamp: i64,
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub temperature: TemperatureInfo,
    pub uptime: UptimeInfo,
    pub network: Vec<NetworkInterface>,
    pub disk: DiskUsage,
    pub loadavg: LoadAverage,
    pub battery: Vec<BatteryInfo>,
    pub docker: Vec<ContainerInfo>,
}

/// Aggregate CPU utilisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    /// Busy share of CPU time (0.0 to 100.0)
    pub usage_percent: f64,
}

/// CPU model information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuInfo {
    /// CPU model name
    pub model: String,
    /// Number of logical processors, at least 1
    pub cores: u32,
}

impl Default for CpuInfo {
    fn default() -> Self {
        Self {
            model: "Unknown CPU".to_string(),
            cores: 1,
        }
    }
}

/// Memory usage in gigabytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    #[serde(rename = "totalGB")]
    pub total_gb: f64,
    #[serde(rename = "usedGB")]
    pub used_gb: f64,
    /// Free memory including reclaimable buffers and page cache
    #[serde(rename = "freeGB")]
    pub free_gb: f64,
    #[serde(rename = "usagePercent")]
    pub usage_percent: f64,
}

/// Temperature sensor readings in degrees Celsius.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureInfo {
    /// Reading of the first available sensor
    #[serde(rename = "cpuC")]
    pub cpu_c: Option<f64>,
    pub sensors: Vec<f64>,
}

/// Time since boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeInfo {
    pub raw_seconds: f64,
    /// Human readable form, e.g. "3d 4h 12m 9s"
    pub formatted: String,
}

impl Default for UptimeInfo {
    fn default() -> Self {
        Self {
            raw_seconds: 0.0,
            formatted: super::format::format_uptime(0.0),
        }
    }
}

/// A non-loopback network interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Interface name (e.g. "eth0")
    pub name: String,
    /// Raw operational state ("up", "down", "unknown", ...)
    pub state: String,
    /// MAC address, "N/A" when the interface exposes none
    pub mac: String,
    pub addresses: Vec<NetworkAddress>,
    pub stats: NetworkStats,
}

/// An address assigned to an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddress {
    pub ip: String,
    pub family: AddressFamily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

/// Interface counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Negotiated link speed in Mbit/s
    pub rx_mbps: Option<f64>,
}

/// Disk usage across the selected filesystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub filesystems: Vec<Filesystem>,
    #[serde(rename = "totalGB")]
    pub total_gb: f64,
    #[serde(rename = "usedGB")]
    pub used_gb: f64,
    #[serde(rename = "availableGB")]
    pub available_gb: f64,
    #[serde(rename = "usagePercent")]
    pub usage_percent: f64,
}

/// One row of disk-free output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filesystem {
    /// Device name (e.g. "/dev/sda2")
    pub device: String,
    /// Logical mount point label
    pub mountpoint: String,
    #[serde(rename = "usagePercent")]
    pub usage_percent: f64,
    /// Sizes as reported by the tool, with unit suffix (e.g. "50G")
    #[serde(rename = "totalGB")]
    pub total_gb: String,
    #[serde(rename = "usedGB")]
    pub used_gb: String,
    #[serde(rename = "availableGB")]
    pub available_gb: String,
}

/// System load averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// A battery exposed under the power-supply class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryInfo {
    /// Device name (e.g. "BAT0")
    pub id: String,
    /// Raw status ("Charging", "Discharging", "Full", ...)
    pub status: String,
    /// Charge level (0 to 100)
    pub percent: u8,
    pub technology: String,
    /// Volts
    pub voltage: Option<f64>,
    /// Amperes
    pub current: Option<f64>,
    #[serde(rename = "powerW")]
    pub power_w: Option<f64>,
    #[serde(rename = "energyFullWh")]
    pub energy_full_wh: Option<f64>,
    #[serde(rename = "energyNowWh")]
    pub energy_now_wh: Option<f64>,
    /// Hours until empty (discharging) or full (charging)
    pub hours_remaining: Option<f64>,
}

/// A container reported by the container runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub image: String,
    pub status: String,
    pub name: String,
    pub ports: String,
    pub created: String,
    pub size: String,
    /// "running", "stopped" or the runtime's own state string
    pub state: String,
    pub networks: String,
}

impl DynamicSnapshot {
    /// Create an all-unavailable snapshot stamped with the current time.
    pub fn new() -> Self {
        Self {
            timestamp: super::format::now_millis(),
            cpu: CpuUsage::default(),
            memory: MemoryUsage::default(),
            temperature: TemperatureInfo::default(),
            uptime: UptimeInfo::default(),
            network: Vec::new(),
            disk: DiskUsage::default(),
            loadavg: LoadAverage::default(),
            battery: Vec::new(),
            docker: Vec::new(),
        }
    }
}

impl Default for DynamicSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
