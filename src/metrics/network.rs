//! Network interface collection from `/sys/class/net` and the `ip` tool.

use crate::error::{Result, SystemError};
use crate::metrics::collector::{read_host_file, HostCollector};
use crate::metrics::data::{AddressFamily, NetworkAddress, NetworkInterface, NetworkStats};
use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tracing::{debug, warn};

impl HostCollector {
    /// All non-loopback interfaces that expose an operational state.
    pub fn network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        let net_dir = self.config.sys_path("class/net");
        let entries = fs::read_dir(&net_dir).map_err(|e| SystemError::io(&net_dir, e))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name != "lo")
            .collect();
        names.sort();

        Ok(names
            .iter()
            .filter_map(|name| self.read_interface(&net_dir.join(name), name))
            .collect())
    }

    fn read_interface(&self, dir: &Path, name: &str) -> Option<NetworkInterface> {
        let state = match read_host_file(&dir.join("operstate")) {
            Ok(state) => state.trim().to_string(),
            Err(e) => {
                debug!("Skipping interface {}: {}", name, e);
                return None;
            }
        };

        let mac = read_host_file(&dir.join("address"))
            .map(|mac| mac.trim().to_string())
            .unwrap_or_else(|_| "N/A".to_string());

        let addresses = match self.address_listing(name) {
            Ok(output) => parse_ip_addr(&output),
            Err(e) => {
                warn!("Could not list addresses for {}: {}", name, e);
                Vec::new()
            }
        };

        let counter = |file: &str| -> u64 {
            read_host_file(&dir.join("statistics").join(file))
                .ok()
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(0)
        };

        // Reading `speed` fails with EINVAL on interfaces that are down
        let rx_mbps = read_host_file(&dir.join("speed"))
            .ok()
            .and_then(|raw| parse_link_speed(&raw));

        Some(NetworkInterface {
            name: name.to_string(),
            state,
            mac,
            addresses,
            stats: NetworkStats {
                rx_bytes: counter("rx_bytes"),
                tx_bytes: counter("tx_bytes"),
                rx_mbps,
            },
        })
    }

    /// `ip addr show <iface>`, inside the host's network namespace if configured.
    fn address_listing(&self, name: &str) -> Result<String> {
        let ip_args = ["ip", "addr", "show", name].map(str::to_string);

        if self.config.enter_host_netns {
            let netns = self.config.proc_path("1/ns/net");
            let mut args = vec![format!("--net={}", netns.display())];
            args.extend(ip_args);
            self.runner.run("nsenter", &args)
        } else {
            self.runner.run("ip", &ip_args[1..])
        }
    }
}

/// Extract IPv4 and non-link-local IPv6 addresses from `ip addr show` output.
pub fn parse_ip_addr(output: &str) -> Vec<NetworkAddress> {
    let mut addresses = Vec::new();

    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        let (Some(kind), Some(cidr)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        let ip = cidr.split('/').next().unwrap_or(cidr);

        match kind {
            "inet" if ip.parse::<Ipv4Addr>().is_ok() => addresses.push(NetworkAddress {
                ip: ip.to_string(),
                family: AddressFamily::Ipv4,
            }),
            "inet6" => match ip.parse::<Ipv6Addr>() {
                Ok(addr) if !is_link_local(&addr) => addresses.push(NetworkAddress {
                    ip: ip.to_string(),
                    family: AddressFamily::Ipv6,
                }),
                _ => {}
            },
            _ => {}
        }
    }

    addresses
}

fn is_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

/// Link speed in Mbit/s; the kernel reports -1 when it is unknown.
pub fn parse_link_speed(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|speed| *speed >= 0)
        .map(|speed| speed as f64)
}
