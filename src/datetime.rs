//! Timestamp helpers for values stored as SQL datetime text.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ModelError, Result};

/// `YYYY-MM-DD HH:MM:SS`
pub const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Placeholder some schemas use for an unset datetime column.
pub const SQL_NULL_DATE: &str = "0000-00-00 00:00:00";

/// Current Unix time in whole seconds, as text.
pub fn unix_timestamp() -> String {
    Utc::now().timestamp().to_string()
}

/// Format a Unix time (UTC) as [`SQL_DATETIME`] text.
pub fn unix_to_sql_datetime(secs: i64, nsecs: u32) -> Result<String> {
    DateTime::<Utc>::from_timestamp(secs, nsecs)
        .map(|dt| to_sql_datetime(&dt.naive_utc()))
        .ok_or(ModelError::InvalidTimestamp { secs, nsecs })
}

pub fn to_sql_datetime(dt: &NaiveDateTime) -> String {
    dt.format(SQL_DATETIME).to_string()
}

/// Parse [`SQL_DATETIME`] text. The [`SQL_NULL_DATE`] placeholder reads as `None`.
pub fn parse_sql_datetime(text: &str) -> Option<NaiveDateTime> {
    if text == SQL_NULL_DATE {
        return None;
    }
    NaiveDateTime::parse_from_str(text, SQL_DATETIME).ok()
}
