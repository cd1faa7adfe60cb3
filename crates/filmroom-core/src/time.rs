//! Timestamp parsing and formatting.
//!
//! Accepted input forms, tried in order:
//!
//! - `H:MM:SS` (hours, minutes, seconds)
//! - `MM:SS` (minutes, seconds)
//! - a non-negative decimal number of seconds
//!
//! Output is always `H:MM:SS`.

use crate::error::{Error, Result};

/// Parse a timestamp into seconds.
pub fn parse(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    let invalid = || Error::InvalidTime(input.to_string());

    let parts: Vec<&str> = trimmed.split(':').collect();
    match parts.as_slice() {
        [h, m, s] => {
            let hours = parse_component(h).ok_or_else(invalid)?;
            let minutes = parse_component(m).ok_or_else(invalid)?;
            let seconds = parse_seconds(s).ok_or_else(invalid)?;
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        [m, s] => {
            let minutes = parse_component(m).ok_or_else(invalid)?;
            let seconds = parse_seconds(s).ok_or_else(invalid)?;
            Ok(minutes * 60.0 + seconds)
        }
        [secs] => parse_seconds(secs).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Format seconds as `H:MM:SS`, clamping negatives to zero.
pub fn format(seconds: f64) -> String {
    // Fractions are truncated; the store keeps full precision.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

/// Whole-number component (hours or minutes).
fn parse_component(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().map(f64::from)
}

/// Non-negative decimal seconds.
fn parse_seconds(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let value = s.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}
