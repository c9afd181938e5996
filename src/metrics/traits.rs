//! Traits at the seams of metrics collection.

use crate::error::Result;
use crate::metrics::data::{DynamicSnapshot, StaticSnapshot};

/// Something that can produce static and dynamic snapshots.
///
/// Implementations are synchronous and may block on file reads and
/// subprocesses; callers on an async runtime should move the call onto a
/// blocking thread. Assembly never fails: a metric that cannot be read is
/// reported with its unavailable value.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Identity facts that stay constant for the life of the host.
    fn static_snapshot(&self) -> StaticSnapshot;

    /// A fresh pass over every time-varying metric.
    fn dynamic_snapshot(&self) -> DynamicSnapshot;
}

/// Runs an external tool and returns its standard output.
///
/// A non-zero exit status is an error.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<String>;
}
