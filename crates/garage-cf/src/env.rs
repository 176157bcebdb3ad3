//! Parsing `cf env` output and rendering local environment files

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CfError;
use garage_types::{EnvFormat, UserProvidedVar, VcapServices};

/// Line terminator used in generated files
#[cfg(windows)]
pub const NEWLINE: &str = "\r\n";
#[cfg(not(windows))]
pub const NEWLINE: &str = "\n";

const VCAP_SERVICES_VAR: &str = "VCAP_SERVICES";

static SYSTEM_PROVIDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?ms)^System-Provided:\n\{\s*"VCAP_SERVICES":(.*?)^\}"#)
        .expect("system-provided pattern is valid")
});

static USER_PROVIDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^User-Provided:\n(.*?)^$").expect("user-provided pattern is valid")
});

static NO_USER_PROVIDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^No user-defined env variables have been set$")
        .expect("no-user-provided pattern is valid")
});

static SAFE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^['a-zA-Z0-9,._+:@%/-]*$").expect("safe value pattern is valid")
});

/// Extract `VCAP_SERVICES` from LF-normalised `cf env` output
pub fn parse_services(env_output: &str) -> Result<VcapServices, CfError> {
    let captures = SYSTEM_PROVIDED
        .captures(env_output)
        .ok_or(CfError::InvalidEnvOutput("cannot parse VCAP_SERVICES"))?;
    Ok(serde_json::from_str(&captures[1])?)
}

/// Extract the user-provided variables from LF-normalised `cf env` output.
///
/// Each `NAME: value` line is split at the first colon and the value is kept
/// as printed, including its leading space.
pub fn parse_user_provided(env_output: &str) -> Result<Vec<UserProvidedVar>, CfError> {
    if NO_USER_PROVIDED.is_match(env_output) {
        return Ok(Vec::new());
    }

    let captures = USER_PROVIDED.captures(env_output).ok_or(CfError::InvalidEnvOutput(
        "cannot parse user-provided environment variables",
    ))?;

    let vars = captures[1]
        .split('\n')
        .filter_map(|line| {
            let (name, value) = line.split_once(':').unwrap_or((line, ""));
            (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect();
    Ok(vars)
}

/// Quote a value for a dotenv file that is also sourced by `sh`
pub fn env_value(value: &str) -> String {
    let value = value.trim();
    if SAFE_VALUE.is_match(value) {
        value.replace('\'', "\\'")
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Shell script that exports the variables in `filename`
pub fn env_script(filename: &str, json: bool) -> String {
    let load = if json {
        r#"VCAP_SERVICES=$(cat "$filename")"#
    } else {
        r#". "$filename""#
    };

    let lines = [
        format!(r#"filename="${{1:-{filename}}}""#),
        "set -a".to_string(),
        load.to_string(),
        "set +a".to_string(),
    ];
    lines.join(NEWLINE) + NEWLINE
}

/// Contents of the file written by `cfutil env`, trailing newline included.
///
/// A user-provided variable named like an earlier one replaces its value in
/// place.
pub fn render_env_file(
    services: &VcapServices,
    user_vars: &[UserProvidedVar],
    format: EnvFormat,
) -> Result<String, CfError> {
    if format.is_json() {
        return Ok(serde_json::to_string_pretty(services)? + NEWLINE);
    }

    let mut vars: Vec<UserProvidedVar> = vec![(
        VCAP_SERVICES_VAR.to_string(),
        serde_json::to_string(services)?,
    )];
    for (name, value) in user_vars {
        match vars.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = value.clone(),
            None => vars.push((name.clone(), value.clone())),
        }
    }

    let output = vars
        .iter()
        .map(|(name, value)| format!("{name}={}", env_value(value)))
        .collect::<Vec<_>>()
        .join(NEWLINE);
    Ok(output + NEWLINE)
}
