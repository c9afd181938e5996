//! Disk usage from the `df` tool.

use crate::error::{Result, SystemError};
use crate::metrics::collector::HostCollector;
use crate::metrics::config::DiskDevice;
use crate::metrics::data::{DiskUsage, Filesystem};
use crate::metrics::format::{clamp_percent, round_to, si_size_to_gb};
use std::collections::HashSet;
use tracing::debug;

/// One data row of `df -H` output.
#[derive(Debug, Clone, PartialEq)]
pub struct DfRow {
    pub device: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percent: f64,
    pub mountpoint: String,
}

impl HostCollector {
    /// Usage of the configured mounts and allow-listed devices.
    pub fn disk_usage(&self) -> Result<DiskUsage> {
        let output = self.runner.run("df", &["-H".to_string()])?;
        let rows = parse_df(&output);
        if rows.is_empty() {
            return Err(SystemError::parse_error("df produced no filesystem rows"));
        }
        Ok(summarize_disks(
            rows,
            &self.config.disk_mounts,
            &self.config.disk_devices,
        ))
    }
}

/// Parse the table printed by `df -H`, skipping the header and short rows.
pub fn parse_df(output: &str) -> Vec<DfRow> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                debug!("Skipping short df row: {:?}", line);
                return None;
            }
            Some(DfRow {
                device: parts[0].to_string(),
                size: parts[1].to_string(),
                used: parts[2].to_string(),
                available: parts[3].to_string(),
                use_percent: parts[4].trim_end_matches('%').parse().unwrap_or(0.0),
                // Mount points may contain spaces
                mountpoint: parts[5..].join(" "),
            })
        })
        .collect()
}

/// Keep rows mounted at one of `mounts` or whose device is allow-listed,
/// each device once, and total them up.
pub fn summarize_disks(rows: Vec<DfRow>, mounts: &[String], devices: &[DiskDevice]) -> DiskUsage {
    let mut seen = HashSet::new();
    let mut filesystems = Vec::new();
    let (mut total, mut used, mut available) = (0.0, 0.0, 0.0);

    for row in rows {
        let mountpoint = match devices.iter().find(|d| d.device == row.device) {
            Some(allowed) => allowed.label.clone().unwrap_or_else(|| row.mountpoint.clone()),
            None if mounts.contains(&row.mountpoint) => row.mountpoint.clone(),
            None => continue,
        };
        if !seen.insert(row.device.clone()) {
            continue;
        }

        total += si_size_to_gb(&row.size).unwrap_or(0.0);
        used += si_size_to_gb(&row.used).unwrap_or(0.0);
        available += si_size_to_gb(&row.available).unwrap_or(0.0);

        filesystems.push(Filesystem {
            device: row.device,
            mountpoint,
            usage_percent: clamp_percent("filesystem usage", row.use_percent),
            total_gb: row.size,
            used_gb: row.used,
            available_gb: row.available,
        });
    }

    // Percentage from the exact sums; only the reported sizes are rounded
    let usage_percent = if total > 0.0 {
        round_to(clamp_percent("disk usage", used / total * 100.0), 2)
    } else {
        0.0
    };

    DiskUsage {
        filesystems,
        total_gb: round_to(total, 2),
        used_gb: round_to(used, 2),
        available_gb: round_to(available, 2),
        usage_percent,
    }
}
