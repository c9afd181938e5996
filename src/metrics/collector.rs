//! Core host metrics collection and snapshot assembly.
//!
//! Every collector re-reads its source on each call and returns a
//! [`Result`]. Failures are turned into the metric's unavailable value in
//! one place, the [`SnapshotSource`] implementation at the bottom of this
//! file, so a missing sensor never prevents the rest of a snapshot.

use crate::error::{Result, SystemError};
use crate::metrics::{
    command::SystemCommandRunner,
    config::CollectorConfig,
    data::*,
    format::{clamp_percent, format_uptime, now_millis, round_to},
    traits::{CommandRunner, SnapshotSource},
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use sysinfo::System;
use tracing::{debug, warn};

/// Candidate temperature sources, relative to the sys mount, in priority order.
const TEMPERATURE_SOURCES: [&str; 3] = [
    "class/thermal/thermal_zone0/temp",
    "class/hwmon/hwmon0/temp1_input",
    "class/hwmon/hwmon1/temp1_input",
];

/// Reads host metrics from host-mounted `/proc`, `/sys`, `/etc` trees and
/// external tools.
#[derive(Clone)]
pub struct HostCollector {
    pub(crate) config: CollectorConfig,
    pub(crate) runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for HostCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCollector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HostCollector {
    /// Create a collector that runs external tools on this machine.
    pub fn new(config: CollectorConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemCommandRunner))
    }

    /// Create a collector with a custom tool runner.
    pub fn with_runner(config: CollectorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Aggregate CPU usage.
    ///
    /// With a non-zero sample interval two counter snapshots are taken that
    /// far apart; otherwise usage is computed over the counters since boot.
    pub fn cpu_usage(&self) -> Result<CpuUsage> {
        let first = self.read_cpu_times()?;
        let interval = self.config.cpu_sample_interval;

        let usage_percent = if interval.is_zero() {
            first.usage_since(&CpuTimes::default())
        } else {
            thread::sleep(interval);
            let second = self.read_cpu_times()?;
            second.usage_since(&first)
        };

        Ok(CpuUsage { usage_percent })
    }

    fn read_cpu_times(&self) -> Result<CpuTimes> {
        let path = self.config.proc_path("stat");
        parse_proc_stat(&read_host_file(&path)?)
    }

    /// CPU model and logical core count.
    pub fn cpu_info(&self) -> Result<CpuInfo> {
        let path = self.config.proc_path("cpuinfo");
        Ok(parse_cpuinfo(&read_host_file(&path)?))
    }

    /// Memory usage, counting buffers and page cache as free.
    pub fn memory_usage(&self) -> Result<MemoryUsage> {
        let path = self.config.proc_path("meminfo");
        parse_meminfo(&read_host_file(&path)?)
    }

    /// Reading of the first temperature source that exists and parses.
    pub fn temperature(&self) -> Result<TemperatureInfo> {
        for source in TEMPERATURE_SOURCES {
            let path = self.config.sys_path(source);
            if !path.exists() {
                continue;
            }
            match read_host_file(&path).and_then(|raw| parse_millidegrees(&raw)) {
                Ok(celsius) => {
                    return Ok(TemperatureInfo {
                        cpu_c: Some(celsius),
                        sensors: vec![celsius],
                    })
                }
                Err(e) => debug!("Skipping temperature source {}: {}", path.display(), e),
            }
        }

        Err(SystemError::parse_error("No temperature sensors found"))
    }

    pub fn load_average(&self) -> Result<LoadAverage> {
        let path = self.config.proc_path("loadavg");
        parse_loadavg(&read_host_file(&path)?)
    }

    pub fn uptime(&self) -> Result<UptimeInfo> {
        let path = self.config.proc_path("uptime");
        let raw_seconds = parse_uptime_seconds(&read_host_file(&path)?)?;
        Ok(UptimeInfo {
            raw_seconds,
            formatted: format_uptime(raw_seconds),
        })
    }

    pub fn hostname(&self) -> Result<String> {
        let path = self.config.etc_path("hostname");
        let hostname = read_host_file(&path)?.trim().to_string();
        if hostname.is_empty() {
            return Err(SystemError::parse_error(format!(
                "{} is empty",
                path.display()
            )));
        }
        Ok(hostname)
    }

    /// Running kernel release, from the host proc tree or the uname of the
    /// running kernel.
    pub fn kernel_release(&self) -> Result<String> {
        let path = self.config.proc_path("sys/kernel/osrelease");
        match read_host_file(&path) {
            Ok(release) if !release.trim().is_empty() => Ok(release.trim().to_string()),
            _ => System::kernel_version()
                .ok_or_else(|| SystemError::parse_error("Kernel release unavailable")),
        }
    }
}

/// Read a host file, attaching the path to any error.
pub(crate) fn read_host_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| SystemError::io(path, e))
}

/// Log a failed collector and substitute its unavailable value.
fn or_unavailable<T: Default>(metric: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        if e.is_not_found() {
            debug!("{} unavailable: {}", metric, e);
        } else {
            warn!("{} unavailable: {}", metric, e);
        }
        T::default()
    })
}

impl SnapshotSource for HostCollector {
    fn static_snapshot(&self) -> StaticSnapshot {
        StaticSnapshot {
            hostname: self.hostname().unwrap_or_else(|e| {
                warn!("hostname unavailable: {}", e);
                "unknown".to_string()
            }),
            platform: "Linux".to_string(),
            arch: std::env::consts::ARCH.to_string(),
            kernel: self.kernel_release().unwrap_or_else(|e| {
                warn!("kernel release unavailable: {}", e);
                "unknown".to_string()
            }),
            cpu: or_unavailable("cpu info", self.cpu_info()),
        }
    }

    fn dynamic_snapshot(&self) -> DynamicSnapshot {
        let mut snapshot = DynamicSnapshot::new();
        snapshot.cpu = or_unavailable("cpu usage", self.cpu_usage());
        snapshot.memory = or_unavailable("memory", self.memory_usage());
        snapshot.temperature = or_unavailable("temperature", self.temperature());
        snapshot.uptime = or_unavailable("uptime", self.uptime());
        snapshot.network = or_unavailable("network", self.network_interfaces());
        snapshot.disk = or_unavailable("disk", self.disk_usage());
        snapshot.loadavg = or_unavailable("load average", self.load_average());
        snapshot.battery = or_unavailable("battery", self.batteries());
        snapshot.docker = or_unavailable("containers", self.containers());
        // Capture time is when assembly finished, after CPU sampling
        snapshot.timestamp = now_millis();
        snapshot
    }
}

/// Cumulative CPU tick counters from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
    }

    /// Ticks spent neither idle nor waiting on I/O.
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Busy percentage between `earlier` and `self`, rounded to two decimals
    /// and clamped to `[0, 100]`.
    pub fn usage_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total() as f64 - earlier.total() as f64;
        if total <= 0.0 {
            return 0.0;
        }
        let idle = self.idle_total() as f64 - earlier.idle_total() as f64;
        let usage = (total - idle) / total * 100.0;
        round_to(clamp_percent("cpu usage", usage), 2)
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// Kernels older than 2.6 omit the trailing counters; those default to 0.
pub fn parse_proc_stat(content: &str) -> Result<CpuTimes> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| SystemError::parse_error("No aggregate cpu line in /proc/stat"))?;

    let values = line
        .split_whitespace()
        .skip(1)
        .take(7)
        .map(|v| v.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SystemError::parse_error(format!("Bad cpu counter: {}", e)))?;

    if values.len() < 4 {
        return Err(SystemError::parse_error(format!(
            "Expected at least 4 cpu counters, got {}",
            values.len()
        )));
    }

    let at = |i: usize| values.get(i).copied().unwrap_or(0);
    Ok(CpuTimes {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
    })
}

/// Parse model name and processor count from `/proc/cpuinfo`.
pub fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut model = None;
    let mut board_model = None;
    let mut cores = 0u32;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "processor" => cores += 1,
            "model name" if model.is_none() => model = Some(value.trim().to_string()),
            // ARM boards report the SoC under "Model" instead
            "Model" if board_model.is_none() => board_model = Some(value.trim().to_string()),
            _ => {}
        }
    }

    CpuInfo {
        model: model
            .or(board_model)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        cores: cores.max(1),
    }
}

/// Parse `/proc/meminfo` into gigabyte figures.
pub fn parse_meminfo(content: &str) -> Result<MemoryUsage> {
    let mut total_kb = None;
    let mut free_kb = 0u64;
    let mut buffers_kb = 0u64;
    let mut cached_kb = 0u64;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Some(kb) = value
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        match key {
            "MemTotal" => total_kb = Some(kb),
            "MemFree" => free_kb = kb,
            "Buffers" => buffers_kb = kb,
            "Cached" => cached_kb = kb,
            _ => {}
        }
    }

    let total_kb = match total_kb {
        Some(kb) if kb > 0 => kb,
        _ => return Err(SystemError::parse_error("MemTotal missing from meminfo")),
    };

    let reclaimable_kb = free_kb.saturating_add(buffers_kb).saturating_add(cached_kb);
    let used_kb = total_kb.saturating_sub(reclaimable_kb);
    let to_gb = |kb: u64| round_to(kb as f64 * 1024.0 / 1024f64.powi(3), 2);
    let usage = used_kb as f64 / total_kb as f64 * 100.0;

    Ok(MemoryUsage {
        total_gb: to_gb(total_kb),
        used_gb: to_gb(used_kb),
        free_gb: to_gb(reclaimable_kb),
        usage_percent: round_to(clamp_percent("memory usage", usage), 2),
    })
}

/// Parse a sensor value in milli-degrees Celsius, rounded to 0.1 °C.
pub fn parse_millidegrees(raw: &str) -> Result<f64> {
    let milli: i64 = raw
        .trim()
        .parse()
        .map_err(|e| SystemError::parse_error(format!("Bad temperature {:?}: {}", raw.trim(), e)))?;
    Ok(round_to(milli as f64 / 1000.0, 1))
}

/// Parse the first three fields of `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Result<LoadAverage> {
    let mut fields = content.split_whitespace().map(|f| f.parse::<f64>());
    let mut next = || -> Result<f64> {
        match fields.next() {
            Some(Ok(v)) if v.is_finite() => Ok(v.max(0.0)),
            _ => Err(SystemError::parse_error(format!(
                "Malformed loadavg: {:?}",
                content.trim()
            ))),
        }
    };

    Ok(LoadAverage {
        load1: next()?,
        load5: next()?,
        load15: next()?,
    })
}

/// Parse the seconds-since-boot field of `/proc/uptime`.
pub fn parse_uptime_seconds(content: &str) -> Result<f64> {
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| SystemError::parse_error(format!("Malformed uptime: {:?}", content.trim())))
}
