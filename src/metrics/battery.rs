//! Battery collection from the power-supply class.

use crate::error::{Result, SystemError};
use crate::metrics::collector::{read_host_file, HostCollector};
use crate::metrics::data::BatteryInfo;
use crate::metrics::format::round_to;
use std::fs;
use std::path::Path;
use tracing::warn;

impl HostCollector {
    /// Every `BAT*` device; an empty list when the host has none.
    pub fn batteries(&self) -> Result<Vec<BatteryInfo>> {
        let supply_dir = self.config.sys_path("class/power_supply");
        if !supply_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(&supply_dir)
            .map_err(|e| SystemError::io(&supply_dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("BAT"))
            .collect();
        names.sort();

        let mut batteries = Vec::with_capacity(names.len());
        for name in names {
            match read_battery(&supply_dir.join(&name), &name) {
                Ok(battery) => batteries.push(battery),
                Err(e) => warn!("Error reading battery {}: {}", name, e),
            }
        }
        Ok(batteries)
    }
}

fn read_battery(dir: &Path, name: &str) -> Result<BatteryInfo> {
    let status = read_host_file(&dir.join("status"))?.trim().to_string();
    let capacity_raw = read_host_file(&dir.join("capacity"))?;
    let capacity: i64 = capacity_raw
        .trim()
        .parse()
        .map_err(|e| SystemError::parse_error(format!("Bad capacity for {}: {}", name, e)))?;

    // Optional attributes: each one may be missing independently
    let technology = read_host_file(&dir.join("technology"))
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|_| "Unknown".to_string());
    let micro = |file: &str| -> Option<f64> {
        read_host_file(&dir.join(file))
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|v| v as f64 / 1_000_000.0)
    };

    let voltage = micro("voltage_now");
    let current = micro("current_now");
    let power_w = micro("power_now");
    let energy_full_wh = micro("energy_full");
    let energy_now_wh = micro("energy_now");

    Ok(BatteryInfo {
        id: name.to_string(),
        hours_remaining: hours_remaining(&status, power_w, energy_full_wh, energy_now_wh),
        status,
        percent: capacity.clamp(0, 100) as u8,
        technology,
        voltage,
        current,
        power_w,
        energy_full_wh,
        energy_now_wh,
    })
}

/// Hours until empty while discharging, or until full while charging.
///
/// `None` unless both power draw and stored energy are known and non-zero.
pub fn hours_remaining(
    status: &str,
    power_w: Option<f64>,
    energy_full_wh: Option<f64>,
    energy_now_wh: Option<f64>,
) -> Option<f64> {
    let power = power_w.filter(|p| *p > 0.0)?;
    let now = energy_now_wh.filter(|e| *e > 0.0)?;

    let hours = match status {
        "Discharging" => now / power,
        "Charging" => (energy_full_wh? - now).max(0.0) / power,
        _ => return None,
    };
    Some(round_to(hours, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::command::testing::ScriptedRunner;
    use crate::metrics::config::CollectorConfig;
    use std::sync::Arc;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn collector_for(root: &Path) -> HostCollector {
        HostCollector::with_runner(
            CollectorConfig::with_host_root(root),
            Arc::new(ScriptedRunner::default()),
        )
    }

    #[test]
    fn test_hours_remaining() {
        assert_eq!(hours_remaining("Discharging", Some(10.0), Some(50.0), Some(25.0)), Some(2.5));
        assert_eq!(hours_remaining("Charging", Some(10.0), Some(50.0), Some(25.0)), Some(2.5));
        assert_eq!(hours_remaining("Full", Some(10.0), Some(50.0), Some(50.0)), None);
        assert_eq!(hours_remaining("Discharging", None, Some(50.0), Some(25.0)), None);
        assert_eq!(hours_remaining("Discharging", Some(0.0), Some(50.0), Some(25.0)), None);
        assert_eq!(hours_remaining("Charging", Some(10.0), None, Some(25.0)), None);
        // An empty or unreported energy counter gives no estimate
        assert_eq!(hours_remaining("Discharging", Some(10.0), Some(50.0), Some(0.0)), None);
        assert_eq!(hours_remaining("Charging", Some(10.0), Some(50.0), Some(0.0)), None);
    }

    #[test]
    fn test_missing_power_supply_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collector_for(dir.path()).batteries().unwrap().is_empty());
    }

    #[test]
    fn test_battery_with_partial_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let bat = "sys/class/power_supply/BAT0";
        write(root, &format!("{}/status", bat), "Discharging\n");
        write(root, &format!("{}/capacity", bat), "87\n");
        write(root, &format!("{}/technology", bat), "Li-ion\n");
        write(root, &format!("{}/voltage_now", bat), "12100000\n");
        write(root, &format!("{}/power_now", bat), "8000000\n");
        write(root, &format!("{}/energy_full", bat), "50000000\n");
        write(root, &format!("{}/energy_now", bat), "40000000\n");
        // Mains adapter is not a battery
        write(root, "sys/class/power_supply/AC/online", "1\n");
        // Required attribute missing: this device is dropped
        write(root, "sys/class/power_supply/BAT1/status", "Unknown\n");

        let batteries = collector_for(root).batteries().unwrap();
        assert_eq!(batteries.len(), 1);

        let battery = &batteries[0];
        assert_eq!(battery.id, "BAT0");
        assert_eq!(battery.status, "Discharging");
        assert_eq!(battery.percent, 87);
        assert_eq!(battery.technology, "Li-ion");
        assert_eq!(battery.voltage, Some(12.1));
        assert_eq!(battery.current, None);
        assert_eq!(battery.power_w, Some(8.0));
        assert_eq!(battery.energy_now_wh, Some(40.0));
        assert_eq!(battery.hours_remaining, Some(5.0));
    }

    #[test]
    fn test_capacity_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "sys/class/power_supply/BAT0/status", "Full\n");
        write(root, "sys/class/power_supply/BAT0/capacity", "104\n");

        let batteries = collector_for(root).batteries().unwrap();
        assert_eq!(batteries[0].percent, 100);
        assert_eq!(batteries[0].technology, "Unknown");
        assert_eq!(batteries[0].hours_remaining, None);
    }
}
