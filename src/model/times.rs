//! Start/end/elapsed times and their display formats

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

const NOT_AVAILABLE: &str = "N/A";

/// Execution times of a node.
///
/// `start` and `end` are absent for items without wall-clock timestamps;
/// `elapsed_millis` is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Times {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub elapsed_millis: i64,
}

impl Times {
    /// Resolve a `[startOffset|null, elapsed]` pair against the report base time
    pub fn from_offsets(base_millis: i64, start_offset: Option<i64>, elapsed_millis: i64) -> Self {
        let start = start_offset.and_then(|offset| timestamp(base_millis, offset));
        let end = start_offset
            .and_then(|offset| offset.checked_add(elapsed_millis))
            .and_then(|offset| timestamp(base_millis, offset));
        Self {
            start,
            end,
            elapsed_millis,
        }
    }

    pub fn elapsed_time(&self) -> String {
        format_elapsed(self.elapsed_millis)
    }

    pub fn start_time(&self) -> String {
        format_date_time(self.start.as_ref())
    }

    pub fn end_time(&self) -> String {
        format_date_time(self.end.as_ref())
    }
}

/// Absolute time of an offset from the report base; `None` when out of range
pub fn timestamp(base_millis: i64, offset_millis: i64) -> Option<DateTime<Utc>> {
    let millis = base_millis.checked_add(offset_millis)?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Whether `[startOffset, elapsed]` lands on representable timestamps
pub fn offsets_in_range(base_millis: i64, start_offset: Option<i64>, elapsed_millis: i64) -> bool {
    match start_offset {
        None => true,
        Some(offset) => {
            timestamp(base_millis, offset).is_some()
                && offset
                    .checked_add(elapsed_millis)
                    .and_then(|end| timestamp(base_millis, end))
                    .is_some()
        }
    }
}

/// `HH:MM:SS.mmm`; hours are not wrapped at 24
pub fn format_elapsed(elapsed_millis: i64) -> String {
    let millis = elapsed_millis.max(0);
    let hours = millis / (60 * 60 * 1000);
    let minutes = millis / (60 * 1000) % 60;
    let seconds = millis / 1000 % 60;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis % 1000)
}

/// `YYYYMMDD HH:MM:SS.mmm`
pub fn format_date_time(date: Option<&DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y%m%d %H:%M:%S%.3f").to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `YYYYMMDD`
pub fn format_date(date: Option<&DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y%m%d").to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `HH:MM:SS.mmm`
pub fn format_time(date: Option<&DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%H:%M:%S%.3f").to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}
