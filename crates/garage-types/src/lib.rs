//! Shared types for garage
//!
//! This crate contains data structures used across multiple garage crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Cloud Foundry Service Types
// ============================================================================

/// A bound service instance as it appears in `VCAP_SERVICES`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub name: String,
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<serde_json::Value>,

    /// Any other keys (plan, tags, syslog_drain_url, ...) kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ServiceInstance {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            credentials: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_credentials(mut self, credentials: serde_json::Value) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Service instances keyed by service label
pub type VcapServices = BTreeMap<String, Vec<ServiceInstance>>;

/// A user-provided environment variable, in the order `cf env` printed it
pub type UserProvidedVar = (String, String);

/// Output format of `cfutil env`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EnvFormat {
    /// `NAME=value` lines, suitable for `set -a; . .env`
    #[default]
    DotEnv,
    /// Pretty-printed `VCAP_SERVICES` JSON only
    Json,
}

impl EnvFormat {
    /// File written when no filename is given
    pub fn default_filename(&self) -> &'static str {
        match self {
            Self::DotEnv => ".env",
            Self::Json => "services.json",
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Component tag prefix used by application instances (`APP/PROC/WEB/0`)
pub const APP_COMPONENT_PREFIX: &str = "APP/";

/// Whitespace stripped from log text: Unicode whitespace except NEL
/// (U+0085), plus the byte order mark (U+FEFF)
pub fn is_log_space(c: char) -> bool {
    c == '\u{feff}' || (c.is_whitespace() && c != '\u{85}')
}

/// Trim log text using [`is_log_space`]
pub fn trim_log_text(text: &str) -> &str {
    text.trim_matches(is_log_space)
}

/// A structured `cf logs` line, split into its parts.
///
/// All fields borrow from the original line. Only lines shaped like
/// `<timestamp> [<component>] <LEVEL><message>` produce one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedLogLine<'a> {
    pub timestamp: &'a str,
    pub component: &'a str,
    pub level: &'a str,
    /// Everything after the level token, untrimmed
    pub message: &'a str,
}

impl<'a> ParsedLogLine<'a> {
    /// Whether the line was written by an application instance
    pub fn is_app(&self) -> bool {
        self.component.starts_with(APP_COMPONENT_PREFIX)
    }

    /// The trimmed message, if it looks like a JSON object
    pub fn payload(&self) -> Option<&'a str> {
        let message = trim_log_text(self.message);
        (message.starts_with('{') && message.ends_with('}')).then_some(message)
    }

    pub fn is_json_payload(&self) -> bool {
        self.payload().is_some()
    }
}

/// What to do with one log line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineSelection<'a> {
    /// Emit the line exactly as received
    Unchanged(&'a str),
    /// Emit the line without surrounding whitespace
    Trimmed(&'a str),
    /// Emit only the embedded JSON object
    Payload(&'a str),
    /// Drop the line
    Suppressed,
}

impl<'a> LineSelection<'a> {
    /// Text to print, or `None` when suppressed
    pub fn text(&self) -> Option<&'a str> {
        match *self {
            Self::Unchanged(s) | Self::Trimmed(s) | Self::Payload(s) => Some(s),
            Self::Suppressed => None,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(component: &'static str, message: &'static str) -> ParsedLogLine<'static> {
        ParsedLogLine {
            timestamp: "2018-12-21T09:45:49.73-0500",
            component,
            level: "OUT",
            message,
        }
    }

    #[test]
    fn test_is_app() {
        assert!(parsed("APP/PROC/WEB/0", "").is_app());
        assert!(!parsed("RTR/18", "").is_app());
        assert!(!parsed("app/proc", "").is_app());
    }

    #[test]
    fn test_payload_is_trimmed_json_object() {
        let line = parsed("APP/PROC/WEB/0", r#" {"msg":"hi"}  "#);
        assert_eq!(line.payload(), Some(r#"{"msg":"hi"}"#));

        assert_eq!(parsed("APP/PROC/WEB/0", " [1, 2]").payload(), None);
        assert_eq!(parsed("APP/PROC/WEB/0", " {unterminated").payload(), None);
        assert_eq!(parsed("APP/PROC/WEB/0", "").payload(), None);
    }

    #[test]
    fn test_payload_ignores_byte_order_mark() {
        let line = parsed("APP/PROC/WEB/0", " {\"msg\":\"hi\"}\u{feff}");
        assert_eq!(line.payload(), Some(r#"{"msg":"hi"}"#));
    }

    #[test]
    fn test_trim_log_text() {
        assert_eq!(trim_log_text("\u{feff} a b\t\u{a0}"), "a b");
        assert_eq!(trim_log_text("\u{2028}x\u{3000}"), "x");
        // NEL is not whitespace in log text
        assert_eq!(trim_log_text("\u{85}x\u{85}"), "\u{85}x\u{85}");
        assert_eq!(trim_log_text(" \u{feff} "), "");
    }

    #[test]
    fn test_selection_text() {
        assert_eq!(LineSelection::Unchanged("  a").text(), Some("  a"));
        assert_eq!(LineSelection::Payload("{}").text(), Some("{}"));
        assert_eq!(LineSelection::Suppressed.text(), None);
        assert!(LineSelection::Suppressed.is_suppressed());
    }

    #[test]
    fn test_service_instance_keeps_extra_keys() {
        let json = r#"{"name":"db","label":"cloudantNoSQLDB","plan":"Shared","tags":["a"]}"#;
        let instance: ServiceInstance = serde_json::from_str(json).unwrap();
        assert_eq!(instance.credentials, None);
        assert_eq!(instance.extra["plan"], "Shared");

        let back = serde_json::to_value(&instance).unwrap();
        assert_eq!(back, serde_json::from_str::<serde_json::Value>(json).unwrap());
    }

    #[test]
    fn test_env_format_default_filename() {
        assert_eq!(EnvFormat::DotEnv.default_filename(), ".env");
        assert_eq!(EnvFormat::Json.default_filename(), "services.json");
    }
}
