use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::io::AsyncRead;
use tokio::process::Command;

use crate::error::CfError;

/// Captured result of a finished cf command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CfOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CfOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Resolves to the exit code once the streaming process ends
pub type ExitFuture = BoxFuture<'static, Result<i32, CfError>>;

/// A running cf command whose stdout is consumed as it is produced
pub struct CfStream {
    pub stdout: Pin<Box<dyn AsyncRead + Send>>,
    pub exit: ExitFuture,
}

/// Capability to run the cf CLI
#[async_trait]
pub trait CfRunner: Send + Sync {
    /// Run to completion and capture stdout/stderr
    async fn output(&self, args: &[String]) -> Result<CfOutput, CfError>;

    /// Start the command with stdout piped; stdin and stderr are shared with
    /// the current process
    async fn stream(&self, args: &[String]) -> Result<CfStream, CfError>;

    /// Command line as shown in messages
    fn describe(&self, args: &[String]) -> String {
        format!("cf {}", args.join(" "))
    }
}

/// Runs the real cf executable
#[derive(Clone, Debug)]
pub struct SystemCf {
    program: PathBuf,
}

impl SystemCf {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemCf {
    fn default() -> Self {
        Self::new("cf")
    }
}

#[async_trait]
impl CfRunner for SystemCf {
    async fn output(&self, args: &[String]) -> Result<CfOutput, CfError> {
        tracing::debug!(command = %self.describe(args), "running cf");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CfError::Spawn {
                command: self.describe(args),
                source,
            })?;

        Ok(CfOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn stream(&self, args: &[String]) -> Result<CfStream, CfError> {
        let command = self.describe(args);
        tracing::debug!(command = %command, "streaming cf");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CfError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| CfError::Spawn {
            command: command.clone(),
            source: std::io::Error::other("stdout was not captured"),
        })?;

        let exit: ExitFuture = Box::pin(async move {
            let status = child
                .wait()
                .await
                .map_err(|source| CfError::Spawn { command, source })?;
            Ok::<_, CfError>(status.code().unwrap_or(1))
        });

        Ok(CfStream {
            stdout: Box::pin(stdout),
            exit,
        })
    }

    fn describe(&self, args: &[String]) -> String {
        let mut command = self.program.display().to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_success() {
        assert!(CfOutput::ok("cf version 6.40.0").success());
        assert!(!CfOutput::failed(1, "", "").success());
        assert!(!CfOutput::default().success());
    }

    #[test]
    fn test_describe() {
        let cf = SystemCf::new("/usr/local/bin/cf");
        let args = vec!["logs".to_string(), "--recent".to_string(), "my-app".to_string()];
        assert_eq!(cf.describe(&args), "/usr/local/bin/cf logs --recent my-app");
        assert_eq!(SystemCf::default().describe(&args), "cf logs --recent my-app");
    }

    #[tokio::test]
    async fn test_missing_executable_fails_to_spawn() {
        let cf = SystemCf::new("/nonexistent/garage/cf");
        let err = cf.output(&["-v".to_string()]).await.unwrap_err();
        assert!(matches!(err, CfError::Spawn { .. }));
    }
}
