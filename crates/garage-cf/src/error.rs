use thiserror::Error;

/// Appended to "Service not found" when running outside Cloud Foundry
pub(crate) const LOCAL_HINT: &str =
    " (have you configured your local environment with CF services?)";

#[derive(Debug, Error)]
pub enum CfError {
    #[error("Unable to run cf executable: check installation and path")]
    Unavailable {
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid cf executable: check installation and path")]
    InvalidExecutable,

    #[error("Failed to run {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `message` is the line of cf's output that explains the failure
    #[error("{message}")]
    CommandFailed {
        message: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid cf env output: {0}")]
    InvalidEnvOutput(&'static str),

    #[error("Invalid service JSON")]
    Json(#[from] serde_json::Error),

    #[error("Service not found: {spec}{hint}")]
    ServiceNotFound { spec: String, hint: &'static str },

    #[error("Multiple instances of service found: {0}")]
    MultipleInstances(String),
}

impl CfError {
    /// Exit code of the failed cf command, if it ran at all
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => None,
        }
    }
}
