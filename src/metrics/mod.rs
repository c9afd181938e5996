//! Host metrics collection and data structures.
//!
//! This module reads CPU, memory, temperature, network, disk, load, uptime,
//! battery and container information from host-mounted `/proc`, `/sys` and
//! `/etc` trees and external tools, and assembles it into static and dynamic
//! snapshots.

pub mod battery;
pub mod collector;
pub mod command;
pub mod config;
pub mod containers;
pub mod data;
pub mod disk;
pub mod format;
pub mod network;
pub mod traits;

// Re-export commonly used items
pub use collector::HostCollector;
pub use command::SystemCommandRunner;
pub use config::{CollectorConfig, DiskDevice};
pub use data::{DynamicSnapshot, StaticSnapshot};
pub use traits::{CommandRunner, SnapshotSource};
