//! Collector configuration: where the host trees are mounted and which
//! external tools to call.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A device included in the disk totals, optionally shown under a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskDevice {
    /// Device path as printed by `df` (e.g. "/dev/sda2")
    pub device: String,
    /// Mount point label to report instead of the one `df` prints
    pub label: Option<String>,
}

impl std::str::FromStr for DiskDevice {
    type Err = crate::SystemError;

    /// Parse `DEVICE` or `DEVICE=LABEL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (device, label) = match s.split_once('=') {
            Some((device, label)) => (device.trim(), Some(label.trim())),
            None => (s.trim(), None),
        };
        if device.is_empty() {
            return Err(crate::SystemError::config_error(format!(
                "Invalid disk device spec: {:?}",
                s
            )));
        }
        Ok(Self {
            device: device.to_string(),
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
        })
    }
}

/// Configuration for [`HostCollector`](super::HostCollector).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Host `/proc` mount
    pub proc_root: PathBuf,
    /// Host `/sys` mount
    pub sys_root: PathBuf,
    /// Host `/etc` mount
    pub etc_root: PathBuf,
    /// Gap between the two CPU counter samples; zero uses counters since boot
    pub cpu_sample_interval: Duration,
    /// Mount points always included in disk totals
    pub disk_mounts: Vec<String>,
    /// Devices included in disk totals regardless of where they are mounted
    pub disk_devices: Vec<DiskDevice>,
    /// Container runtime CLI
    pub docker_bin: String,
    /// Run the address tool inside PID 1's network namespace
    pub enter_host_netns: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/host/proc"),
            sys_root: PathBuf::from("/host/sys"),
            etc_root: PathBuf::from("/host/etc"),
            cpu_sample_interval: Duration::from_millis(crate::DEFAULT_CPU_SAMPLE_MS),
            disk_mounts: vec!["/".to_string()],
            disk_devices: Vec::new(),
            docker_bin: "docker".to_string(),
            enter_host_netns: true,
        }
    }
}

impl CollectorConfig {
    /// Configuration reading every tree from under a single root directory,
    /// laid out as `<root>/proc`, `<root>/sys` and `<root>/etc`.
    pub fn with_host_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            proc_root: root.join("proc"),
            sys_root: root.join("sys"),
            etc_root: root.join("etc"),
            ..Default::default()
        }
    }

    pub fn with_proc_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.proc_root = path.into();
        self
    }

    pub fn with_sys_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.sys_root = path.into();
        self
    }

    pub fn with_etc_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.etc_root = path.into();
        self
    }

    /// Set the CPU sampling gap.
    pub fn with_cpu_sample_interval(mut self, interval: Duration) -> Self {
        self.cpu_sample_interval = interval;
        self
    }

    /// Replace the list of mount points included in disk totals.
    pub fn with_disk_mounts(mut self, mounts: Vec<String>) -> Self {
        self.disk_mounts = mounts;
        self
    }

    /// Replace the device allow-list used for disk totals.
    pub fn with_disk_devices(mut self, devices: Vec<DiskDevice>) -> Self {
        self.disk_devices = devices;
        self
    }

    pub fn with_docker_bin(mut self, bin: impl Into<String>) -> Self {
        self.docker_bin = bin.into();
        self
    }

    pub fn with_host_netns(mut self, enter: bool) -> Self {
        self.enter_host_netns = enter;
        self
    }

    /// Path below the proc mount.
    pub fn proc_path(&self, rel: &str) -> PathBuf {
        self.proc_root.join(rel)
    }

    /// Path below the sys mount.
    pub fn sys_path(&self, rel: &str) -> PathBuf {
        self.sys_root.join(rel)
    }

    /// Path below the etc mount.
    pub fn etc_path(&self, rel: &str) -> PathBuf {
        self.etc_root.join(rel)
    }
}
