//! Date helpers: relative "time since" strings and GData timestamps

use chrono::{DateTime, NaiveDateTime};

use crate::{Error, Result};

const CHUNKS: [(i64, &str, &str); 4] = [
    (60 * 60 * 24, "day", "days"),
    (60 * 60, "hour", "hours"),
    (60, "minute", "minutes"),
    (1, "second", "seconds"),
];

/// Time between `d` and `now` in one unit, the largest non-zero of days,
/// hours, minutes and seconds ("3 hours"). Ten seconds or less, or a `d`
/// in the future, is "just a second".
pub fn relative_timesince(d: NaiveDateTime, now: NaiveDateTime) -> String {
    let since = (now - d).num_seconds();
    if since <= 10 {
        return "just a second".to_string();
    }

    for (seconds, singular, plural) in CHUNKS {
        let count = since / seconds;
        if count != 0 {
            let name = if count == 1 { singular } else { plural };
            return format!("{} {}", count, name);
        }
    }

    "just now".to_string()
}

/// Parse a GData/Atom timestamp such as `2008-03-04T05:06:07.000Z`.
///
/// Fractional seconds and any zone suffix are ignored.
pub fn parse_gdata_time(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    let head = trimmed.get(..19).unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Error::bad_timestamp(value, e))
}

/// Convert unix seconds (as Flickr and Twitter send them) to naive UTC
pub fn from_unix_seconds(value: &str) -> Result<NaiveDateTime> {
    let secs: i64 = value
        .trim()
        .parse()
        .map_err(|e| Error::bad_timestamp(value, e))?;
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| Error::bad_timestamp(value, "out of range"))
}

/// Current time as naive UTC, the representation stored in the database
pub fn now_naive() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
