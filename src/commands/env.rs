use anyhow::{Context, Result};
use async_trait::async_trait;
use garage_cf::{EnvFormat, env_script, parse_services, parse_user_provided, render_env_file};
use garage_utils::logger::redact;

use super::{AppContext, Command};

/// Script written next to the env file by `--script`
pub const ENV_SCRIPT_FILE: &str = "env.sh";

/// Keys whose values never reach the log
const SECRET_KEYS: &[&str] = &["password", "apikey", "apiKey", "secret", "url", "uri"];

/// `cfutil env`: save an app's Cloud Foundry environment for local runs
pub struct EnvCommand {
    pub app: String,
    pub format: EnvFormat,
    /// Include user-provided variables (dotenv only)
    pub user: bool,
    pub script: bool,
    pub filename: Option<String>,
}

impl EnvCommand {
    fn filename(&self) -> &str {
        self.filename
            .as_deref()
            .unwrap_or_else(|| self.format.default_filename())
    }
}

#[async_trait]
impl Command for EnvCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<i32> {
        ctx.cf.check().await?;

        let output = ctx.cf.env(&self.app).await?;
        let services = parse_services(&output)?;
        if let Ok(value) = serde_json::to_value(&services) {
            tracing::debug!(services = %redact(&value, SECRET_KEYS), "parsed VCAP_SERVICES");
        }

        let user_vars = if self.user && !self.format.is_json() {
            parse_user_provided(&output)?
        } else {
            Vec::new()
        };

        let filename = self.filename();
        let contents = render_env_file(&services, &user_vars, self.format)?;
        let path = ctx.work_dir.join(filename);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), services = services.len(), vars = user_vars.len(), "wrote environment");

        if self.script {
            let script_path = ctx.work_dir.join(ENV_SCRIPT_FILE);
            tokio::fs::write(&script_path, env_script(filename, self.format.is_json()))
                .await
                .with_context(|| format!("Failed to write {}", script_path.display()))?;
        }

        Ok(0)
    }
}
