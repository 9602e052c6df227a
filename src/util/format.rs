use time::OffsetDateTime;
use time::macros::format_description;

/// Convert a timestamp to whole seconds for storage
pub fn to_unix(at: OffsetDateTime) -> i64 {
    at.unix_timestamp()
}

/// Convert stored seconds back to a timestamp, clamping garbage to the epoch
pub fn from_unix(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS` (UTC), or "never" for the epoch
pub fn format_timestamp(at: OffsetDateTime) -> String {
    if at == OffsetDateTime::UNIX_EPOCH {
        return "never".to_string();
    }

    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.format(&format).unwrap_or_else(|_| "unknown".to_string())
}
