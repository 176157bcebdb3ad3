use garage_types::{LineSelection, trim_log_text};

use crate::parser::LogParser;

/// Selection rules for `cf logs` lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineFilter {
    /// Keep only lines from `APP/...` components
    app_only: bool,

    /// Keep only lines carrying a JSON payload
    json_only: bool,
}

impl LineFilter {
    /// Create a filter that passes everything through
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to application-originated lines
    pub fn app_only(mut self, app_only: bool) -> Self {
        self.app_only = app_only;
        self
    }

    /// Restrict to lines whose message is a JSON object
    pub fn json_only(mut self, json_only: bool) -> Self {
        self.json_only = json_only;
        self
    }

    /// Decide what to print for one line.
    ///
    /// Unstructured lines are continuations of an earlier message and keep
    /// their indentation. Structured lines from other components are dropped
    /// when `app_only` is set, before any payload check. A JSON payload is
    /// printed on its own, without the timestamp/component/level prefix.
    pub fn select<'a>(&self, line: &'a str) -> LineSelection<'a> {
        let Some(parsed) = LogParser::parse(line) else {
            return if self.json_only {
                LineSelection::Suppressed
            } else {
                LineSelection::Unchanged(line)
            };
        };

        if self.app_only && !parsed.is_app() {
            return LineSelection::Suppressed;
        }

        if let Some(payload) = parsed.payload() {
            return LineSelection::Payload(payload);
        }

        if self.json_only {
            LineSelection::Suppressed
        } else {
            LineSelection::Trimmed(trim_log_text(line))
        }
    }

    /// Check if the filter passes every line through unmodified or trimmed
    pub fn is_empty(&self) -> bool {
        !self.app_only && !self.json_only
    }
}
