//! Duration parsing utilities.

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a duration string like "2d", "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
/// - Days suffix: "2d"
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    for (suffix, unit, scale) in [
        ('d', "days", 86_400),
        ('h', "hours", 3_600),
        ('m', "minutes", 60),
        ('s', "seconds", 1),
    ] {
        if let Some(num_str) = s.strip_suffix(suffix) {
            let value: u64 = num_str
                .trim()
                .parse()
                .with_context(|| format!("Invalid {unit} value: {num_str}"))?;
            return value
                .checked_mul(scale)
                .with_context(|| format!("Duration too large: {s}"));
        }
    }

    // No suffix - treat as seconds
    s.parse::<u64>()
        .with_context(|| format!("Invalid duration value: {s}"))
}

pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    parse_duration_to_secs(s).map(Duration::from_secs)
}

/// Serde adapter accepting either a bare number of seconds or a suffixed
/// string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
