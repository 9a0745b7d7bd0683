use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Format used when the writer stamps `created`, `updated` and `completed`.
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Current local time in the stamp format.
pub fn now_stamp() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

/// Parse a stored date value leniently for ordering and comparison.
///
/// Stored values stay verbatim strings; this only interprets them where a
/// chronological order is needed. Date-only values count as midnight.
pub fn parse_date_value(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, STAMP_FORMAT) {
        return Some(stamp);
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(stamp);
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(stamp);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.naive_local());
    }
    None
}

/// Parse a user-supplied cutoff for on-or-before comparisons. A bare date
/// means the whole day, so it maps to the day's last second instead of
/// midnight.
pub fn parse_cutoff_value(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(23, 59, 59);
    }
    parse_date_value(trimmed)
}

/// True when the value is readable under one of the accepted date formats.
pub fn is_valid_date_value(value: &str) -> bool {
    parse_date_value(value).is_some()
}
