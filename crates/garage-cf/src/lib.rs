//! Cloud Foundry integration for garage
//!
//! This crate wraps the `cf` CLI behind a runner trait, parses the output of
//! `cf env`, renders local environment files, and looks up bound service
//! credentials at runtime.

mod client;
mod env;
mod error;
mod fake;
mod runner;
mod services;

pub use client::CfClient;
pub use env::{NEWLINE, env_script, env_value, parse_services, parse_user_provided, render_env_file};
pub use error::CfError;
pub use fake::FakeCf;
pub use runner::{CfOutput, CfRunner, CfStream, ExitFuture, SystemCf};
pub use services::{CfEnv, ServiceSpec};

// Re-export types that are used in our public API
pub use garage_types::{EnvFormat, ServiceInstance, UserProvidedVar, VcapServices};
