//! Timestamp value object pinned to the operators' local offset.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Immutable point in time, carried in the local offset it is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    /// Creates a timestamp for the current moment in the given offset.
    pub fn now_in(offset: FixedOffset) -> Self {
        Self(Utc::now().with_timezone(&offset))
    }

    /// Creates a timestamp from an existing DateTime.
    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    /// Seconds since the Unix epoch.
    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }

    /// `YYYY-MM-DD HH:MM:SS`, the submission-time column format.
    pub fn to_record_string(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// `YYYY-MM-DD_HH-MM`, safe for folder names.
    pub fn to_folder_stamp(&self) -> String {
        self.0.format("%Y-%m-%d_%H-%M").to_string()
    }
}

/// Parses an offset such as `+05:00`, `-03:30` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ValidationError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| ValidationError::invalid_format("utc_offset", raw));
    }

    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => {
            return Err(ValidationError::invalid_format(
                "utc_offset",
                "expected a leading '+' or '-'",
            ))
        }
    };

    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours
        .parse()
        .map_err(|_| ValidationError::invalid_format("utc_offset", "hours are not a number"))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| ValidationError::invalid_format("utc_offset", "minutes are not a number"))?;
    if hours > 14 || minutes > 59 {
        return Err(ValidationError::invalid_format("utc_offset", "out of range"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| ValidationError::invalid_format("utc_offset", "out of range"))
}
