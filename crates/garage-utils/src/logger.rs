//! Logger setup on top of `tracing-subscriber`
//!
//! The output depends on the environment: tests log everything to
//! `test.log` and only warnings to stderr, scripts print terse
//! `name: message` lines to stderr, and applications write JSON lines to
//! stdout.

use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::app_env::AppEnv;
use crate::time;

/// Variable overriding the default level
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

/// Level names accepted in `LOG_LEVEL`
pub const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "fatal"];

/// Replacement for redacted values
pub const REDACTED: &str = "*****";

const TEST_LOG_FILE: &str = "test.log";

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to open log file {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global logger is already installed")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Where and how log events are written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    /// JSON lines on stdout
    App,
    /// `name: message` on stderr
    Script,
    /// JSON to `test.log`, warnings on stderr
    Test,
}

impl LogMode {
    fn default_level(&self) -> LevelFilter {
        match self {
            Self::App => LevelFilter::DEBUG,
            Self::Script => LevelFilter::WARN,
            Self::Test => LevelFilter::TRACE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    pub name: String,
    pub mode: LogMode,
    pub level: LevelFilter,
}

impl LoggerConfig {
    /// Pick the mode from the environment and the level from `LOG_LEVEL`,
    /// ignoring level names that are not recognised
    pub fn from_app_env(app_env: &AppEnv, name: &str, log_level: Option<&str>) -> Self {
        let mode = if app_env.is_test() {
            LogMode::Test
        } else if app_env.is_script() {
            LogMode::Script
        } else {
            LogMode::App
        };
        let level = log_level
            .and_then(parse_level)
            .unwrap_or_else(|| mode.default_level());

        Self {
            name: if app_env.is_test() { "test".to_string() } else { name.to_string() },
            mode,
            level,
        }
    }
}

/// Parse one of [`LEVELS`]; `fatal` maps to error
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" | "fatal" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

/// Install the global subscriber described by `config`
pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
    let layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = match config.mode {
        LogMode::App => vec![
            tracing_subscriber::fmt::layer()
                .json()
                .with_timer(IsoUtcTimer)
                .with_writer(std::io::stdout)
                .with_filter(config.level)
                .boxed(),
        ],
        LogMode::Script => vec![
            tracing_subscriber::fmt::layer()
                .event_format(ScriptFormat {
                    name: script_name(&config.name).to_string(),
                })
                .with_writer(std::io::stderr)
                .with_filter(config.level)
                .boxed(),
        ],
        LogMode::Test => {
            let path = PathBuf::from(TEST_LOG_FILE);
            let file = File::create(&path).map_err(|source| LoggerError::OpenFile {
                path: path.clone(),
                source,
            })?;
            vec![
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(IsoUtcTimer)
                    .with_writer(Mutex::new(file))
                    .with_filter(config.level)
                    .boxed(),
                tracing_subscriber::fmt::layer()
                    .with_timer(IsoUtcTimer)
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::WARN)
                    .boxed(),
            ]
        }
    };

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

/// Names like `cfutil/env` are shortened to their first segment
fn script_name(name: &str) -> &str {
    name.split('/').next().unwrap_or(name)
}

/// Timestamps as `YYYY-MM-DDTHH:mm:ss.SSSZ`
#[derive(Clone, Copy, Debug, Default)]
pub struct IsoUtcTimer;

impl FormatTime for IsoUtcTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", time::now_iso_utc())
    }
}

/// `name: message field=value`
struct ScriptFormat {
    name: String,
}

impl<S, N> FormatEvent<S, N> for ScriptFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}: ", self.name)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Deep-copy a JSON value, replacing the values of the named keys at any
/// depth with [`REDACTED`]
pub fn redact(value: &Value, props: &[&str]) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| redact(v, props)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if props.contains(&k.as_str()) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(v, props)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
