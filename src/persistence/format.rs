//! Location log line format
//!
//! One line per sample, numbered from 1 in capture order:
//!
//! ```text
//! Segundo 1: Latitud = 10.0, Longitud = 20.0
//! ```

use crate::location::LocationFix;
use chrono::{DateTime, TimeZone};

/// Render a coordinate with the shortest round-trip digits, always keeping a
/// fractional part. Magnitudes in `[1e-3, 1e7)` use plain decimals (`10.0`,
/// `-0.0015`); anything else uses a `1.0E-5` style exponent.
pub fn format_coordinate(value: f64) -> String {
    let magnitude = value.abs();
    if !value.is_finite() || value == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{:?}", value);
    }

    let scientific = format!("{:e}", value);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => {
            format!("{}E{}", mantissa, exponent)
        }
        Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
        None => scientific,
    }
}

/// Render a single sample line (without the trailing newline)
pub fn format_sample_line(index: usize, fix: &LocationFix) -> String {
    format!(
        "Segundo {}: Latitud = {}, Longitud = {}",
        index,
        format_coordinate(fix.latitude),
        format_coordinate(fix.longitude)
    )
}

/// Render all samples of a session, 1-based
pub fn session_log_lines(samples: &[LocationFix]) -> Vec<String> {
    samples
        .iter()
        .enumerate()
        .map(|(i, fix)| format_sample_line(i + 1, fix))
        .collect()
}

/// Location log file name for a session
pub fn log_file_name<Tz: TimeZone>(started_at: &DateTime<Tz>) -> String {
    format!("ubicaciones_{}.txt", started_at.timestamp_millis())
}

/// Video file name for a session
pub fn video_file_name<Tz: TimeZone>(started_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("video_{}.mp4", started_at.format("%Y%m%d_%H%M%S"))
}
