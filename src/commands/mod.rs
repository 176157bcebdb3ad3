use std::path::PathBuf;

use async_trait::async_trait;
use garage_cf::CfClient;

use crate::config::Config;

pub mod env;
pub mod logs;

pub use env::EnvCommand;
pub use logs::LogsCommand;

/// Everything a command needs from the outside world
pub struct AppContext {
    pub cf: CfClient,
    pub config: Config,
    /// Relative output paths are resolved against this directory
    pub work_dir: PathBuf,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Run the command, returning the process exit code
    async fn execute(&self, ctx: &AppContext) -> anyhow::Result<i32>;
}
