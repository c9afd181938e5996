//! Pure formatting and numeric helpers shared by the collectors.

use tracing::warn;

/// Current wall-clock time as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Clamp a percentage into `[0, 100]`, mapping NaN to 0.
///
/// Out-of-range inputs indicate inconsistent source counters and are logged.
pub fn clamp_percent(metric: &str, value: f64) -> f64 {
    if value.is_nan() {
        warn!("{} produced NaN, reporting 0%", metric);
        return 0.0;
    }
    if !(0.0..=100.0).contains(&value) {
        warn!("{} out of range ({:.2}%), clamping", metric, value);
    }
    value.clamp(0.0, 100.0)
}

/// Format an uptime in seconds as `"{d}d {h}h {m}m {s}s"`.
pub fn format_uptime(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;
    format!("{}d {}h {}m {}s", days, hours, minutes, secs)
}

/// Convert a `df -H` style size ("50G", "1.2T", "512M", "0") into gigabytes.
///
/// The suffixes are SI powers of 1000. Returns `None` for anything that
/// does not start with a number.
pub fn si_size_to_gb(size: &str) -> Option<f64> {
    let size = size.trim();
    let split = size
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(size.len());
    let (number, unit) = size.split_at(split);
    let value: f64 = number.parse().ok()?;

    let scale = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1e-9,
        "K" | "KB" => 1e-6,
        "M" | "MB" => 1e-3,
        "G" | "GB" => 1.0,
        "T" | "TB" => 1e3,
        "P" | "PB" => 1e6,
        "E" | "EB" => 1e9,
        _ => return None,
    };

    Some(value * scale)
}
