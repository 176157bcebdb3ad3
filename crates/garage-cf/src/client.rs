use std::path::PathBuf;
use std::sync::Arc;

use crate::error::CfError;
use crate::runner::{CfOutput, CfRunner, CfStream, SystemCf};

const VERSION_PREFIX: &str = "cf version";

/// High-level operations on the cf CLI
#[derive(Clone)]
pub struct CfClient {
    runner: Arc<dyn CfRunner>,
}

impl CfClient {
    pub fn new<R>(runner: R) -> Self
    where
        R: CfRunner + 'static,
    {
        Self {
            runner: Arc::new(runner),
        }
    }

    /// Client for the cf executable at `program` (looked up on PATH when bare)
    pub fn system(program: impl Into<PathBuf>) -> Self {
        Self::new(SystemCf::new(program))
    }

    /// Verify that cf can be run and identifies itself as cf
    pub async fn check(&self) -> Result<(), CfError> {
        let output = match self.runner.output(&args(&["-v"])).await {
            Ok(output) => output,
            Err(CfError::Spawn { source, .. }) => {
                return Err(CfError::Unavailable {
                    source: Some(source),
                });
            }
            Err(e) => return Err(e),
        };

        if !output.success() {
            return Err(CfError::Unavailable { source: None });
        }
        if !output.stdout.starts_with(VERSION_PREFIX) {
            return Err(CfError::InvalidExecutable);
        }

        tracing::debug!(version = %output.stdout.trim(), "cf available");
        Ok(())
    }

    /// Captured, LF-normalised output of `cf env <app>`
    pub async fn env(&self, app: &str) -> Result<String, CfError> {
        let args = args(&["env", app]);
        let output = self.runner.output(&args).await?;
        if !output.success() {
            return Err(command_failed(self.runner.describe(&args), output));
        }
        Ok(to_lf(&output.stdout))
    }

    /// Start `cf logs [--recent] <app>`
    pub async fn logs(&self, app: &str, recent: bool) -> Result<CfStream, CfError> {
        let mut args = vec!["logs".to_string()];
        if recent {
            args.push("--recent".to_string());
        }
        args.push(app.to_string());
        self.runner.stream(&args).await
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn to_lf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// cf prints "FAILED" on the first line and the reason on the second
fn command_failed(command: String, output: CfOutput) -> CfError {
    let stdout = to_lf(&output.stdout);
    let message = stdout
        .split('\n')
        .nth(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match output.code {
            Some(code) => format!("{command} failed with exit code {code}"),
            None => format!("{command} was terminated"),
        });

    CfError::CommandFailed {
        message,
        command,
        code: output.code,
        stderr: output.stderr,
    }
}
