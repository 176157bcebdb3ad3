//! Utilities shared by garage applications
//!
//! Environment detection, logger setup, HTTP-style errors and ISO-8601
//! time helpers.

pub mod app_env;
pub mod errors;
pub mod logger;
pub mod time;

pub use app_env::{AppEnv, AppEnvError, Environment, Tier};
pub use errors::{ErrorBody, HttpError, stack_with_cause};
pub use logger::{LogMode, LoggerConfig, LoggerError};
