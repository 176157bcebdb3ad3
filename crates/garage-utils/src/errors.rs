//! HTTP-style errors and error reporting helpers

use std::error::Error as StdError;

use serde::Serialize;
use thiserror::Error;

use crate::app_env::AppEnv;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Stop following `source()` after this many causes
const MAX_CAUSES: usize = 4;

/// An error carrying the HTTP status it should be reported with
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpError {
    status: u16,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl HttpError {
    /// Create an error; `detail` is appended as `"<message>: <detail>"`
    pub fn new(status: u16, message: &str, detail: Option<&str>) -> Self {
        let message = match detail {
            Some(detail) => format!("{message}: {detail}"),
            None => message.to_string(),
        };
        Self {
            status,
            message,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request(detail: &str) -> Self {
        Self::new(400, "Bad request", Some(detail))
    }

    pub fn unauthorized() -> Self {
        Self::new(401, "Unauthorized", None)
    }

    pub fn forbidden(detail: &str) -> Self {
        Self::new(403, "Forbidden", Some(detail))
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not found", None)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(405, "Method not allowed", None)
    }

    pub fn conflict(detail: &str) -> Self {
        Self::new(409, "Conflict", Some(detail))
    }

    pub fn internal_server_error() -> Self {
        Self::new(500, "Internal server error", None)
    }

    /// A missing required request parameter
    pub fn required_param(param: &str) -> Self {
        Self::required_param_with_status(param, 400)
    }

    pub fn required_param_with_status(param: &str, status: u16) -> Self {
        Self::new(
            status,
            &format!("Required parameter \"{param}\" is missing."),
            None,
        )
    }
}

/// JSON body sent back for a failed request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Status and message for any error; non-[`HttpError`]s map to 500
pub fn response_body(err: &(dyn StdError + 'static)) -> ErrorBody {
    let status = err
        .downcast_ref::<HttpError>()
        .map_or(500, HttpError::status);
    let message = err.to_string();

    ErrorBody {
        status,
        message: (!message.is_empty()).then_some(message),
        stack: None,
    }
}

/// Build the response for a failed request.
///
/// Server errors (status >= 500) are logged. The cause chain is included in
/// the body everywhere except production.
pub fn error_response(err: &(dyn StdError + 'static), app_env: &AppEnv) -> ErrorBody {
    let mut body = response_body(err);
    if body.status >= 500 {
        tracing::error!(status = body.status, error = %stack_with_cause(err), "request failed");
    }
    if !app_env.is_prod() {
        body.stack = Some(stack_with_cause(err));
    }
    body
}

/// The error followed by its chain of causes, one `Caused by:` line each
pub fn stack_with_cause(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    let mut depth = 0;
    while let Some(cause) = source {
        if depth == MAX_CAUSES {
            break;
        }
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
        depth += 1;
    }
    out
}
