//! Container list from the container runtime CLI.

use crate::error::Result;
use crate::metrics::collector::HostCollector;
use crate::metrics::data::ContainerInfo;
use serde::Deserialize;
use tracing::warn;

/// One line of `docker ps --format "{{json .}}"`.
#[derive(Debug, Deserialize)]
struct RawContainer {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Ports", default)]
    ports: String,
    #[serde(rename = "CreatedAt", default)]
    created_at: String,
    #[serde(rename = "Size", default)]
    size: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Networks", default)]
    networks: String,
}

impl From<RawContainer> for ContainerInfo {
    fn from(raw: RawContainer) -> Self {
        let state = if raw.state.is_empty() {
            if raw.status.to_lowercase().contains("up") {
                "running".to_string()
            } else {
                "stopped".to_string()
            }
        } else {
            raw.state
        };

        Self {
            id: raw.id,
            image: raw.image,
            status: raw.status,
            name: raw.names,
            ports: if raw.ports.is_empty() {
                "No ports exposed".to_string()
            } else {
                raw.ports
            },
            created: raw.created_at,
            size: raw.size,
            state,
            networks: raw.networks,
        }
    }
}

impl HostCollector {
    /// Running containers as reported by the runtime CLI.
    pub fn containers(&self) -> Result<Vec<ContainerInfo>> {
        let args = ["ps", "--format", "{{json .}}"].map(str::to_string);
        let output = self.runner.run(&self.config.docker_bin, &args)?;
        Ok(parse_container_lines(&output))
    }
}

/// Parse one JSON object per line; malformed lines are logged and dropped.
pub fn parse_container_lines(output: &str) -> Vec<ContainerInfo> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<RawContainer>(line) {
            Ok(raw) => Some(ContainerInfo::from(raw)),
            Err(e) => {
                warn!("Error parsing container data: {}", e);
                None
            }
        })
        .collect()
}
