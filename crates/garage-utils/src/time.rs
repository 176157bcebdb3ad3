//! ISO-8601 and UNIX time helpers

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

/// Date, hour, optional minutes/seconds/fraction, then a mandatory UTC offset
static ISO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})T(\d{2})(?::(\d{2})(?::(\d{2})(?:[.,](\d{1,9}))?)?)?(Z|[+-]\d{2}(?::?\d{2})?)$",
    )
    .expect("ISO-8601 pattern is valid")
});

/// Create a UTC date-time from milliseconds since the Epoch.
/// Returns `None` when the value is out of range.
pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Parse a UNIX time in milliseconds from the leading integer of `input`.
///
/// Anything after the integer is ignored, so `"1318781876406.62 ms"` parses.
/// Zero, a missing integer, or an out-of-range value yield `None`.
pub fn parse_unix_time(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    let millis = if negative { -magnitude } else { magnitude };

    if millis == 0 {
        return None;
    }
    from_unix_millis(millis)
}

/// Strictly parse an ISO-8601 date-time that specifies a UTC offset (or `Z`).
///
/// The result keeps the offset given in the string. Strings without an
/// offset, with an invalid calendar date, or in any other shape give `None`.
pub fn parse_iso(input: &str) -> Option<DateTime<FixedOffset>> {
    let caps = ISO_PATTERN.captures(input)?;
    let num = |i: usize| -> Option<u32> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
    };

    let year: i32 = caps[1].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;

    let nanos = match caps.get(7) {
        Some(frac) => {
            let digits = frac.as_str();
            let scale = 10u32.pow(9 - digits.len() as u32);
            digits.parse::<u32>().ok()? * scale
        }
        None => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(num(4)?, num(5)?, num(6)?, nanos)?;

    let offset = parse_offset(&caps[8])?;
    offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    if s == "Z" {
        return FixedOffset::east_opt(0);
    }

    let sign = if s.starts_with('-') { -1 } else { 1 };
    let rest = s[1..].replace(':', "");
    let hours: i32 = rest.get(..2)?.parse().ok()?;
    let minutes: i32 = match rest.get(2..) {
        Some("") | None => 0,
        Some(m) => m.parse().ok()?,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// True for an ISO-8601 date-time string with a zero UTC offset
pub fn is_iso_utc(input: &str) -> bool {
    parse_iso(input).is_some_and(|dt| dt.offset().local_minus_utc() == 0)
}

/// Format as `YYYY-MM-DDTHH:mm:ss.SSSZ` in UTC
pub fn format_iso_utc<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// The current time as `YYYY-MM-DDTHH:mm:ss.SSSZ`
pub fn now_iso_utc() -> String {
    format_iso_utc(&Utc::now())
}
