use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};

use garage_types::ParsedLogLine;
use garage_utils::time;
use regex::Regex;

/// `   <timestamp> [<component>] <LEVEL><message>` as written by `cf logs`.
///
/// Component and message stop at line separators (U+2028, U+2029) as well
/// as CR/LF.
static STRUCTURED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^ +(?P<timestamp>[-:.TZ0-9]+) ",
        r"\[(?P<component>[^\r\n\x{2028}\x{2029}]*?)\] ",
        r"(?P<level>[A-Z]+)(?P<message>[^\r\n\x{2028}\x{2029}]*)$",
    ))
    .expect("structured line pattern is valid")
});

/// Parser for `cf logs` output lines
pub struct LogParser;

impl LogParser {
    /// Split a structured line into its parts.
    ///
    /// Returns `None` for anything else, e.g. the continuation lines of a
    /// multi-line stack trace. That is an expected outcome, not an error.
    pub fn parse(line: &str) -> Option<ParsedLogLine<'_>> {
        let caps = STRUCTURED_LINE.captures(line)?;
        let part = |name: &str| caps.name(name).map_or("", |m| m.as_str());

        Some(ParsedLogLine {
            timestamp: part("timestamp"),
            component: part("component"),
            level: part("level"),
            message: part("message"),
        })
    }

    /// Parse the timestamp of a structured line, if it is a valid ISO-8601
    /// date-time with an offset
    pub fn timestamp(parsed: &ParsedLogLine<'_>) -> Option<DateTime<FixedOffset>> {
        time::parse_iso(parsed.timestamp)
    }
}
