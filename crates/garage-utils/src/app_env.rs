//! Application environment detection
//!
//! Works out where the application is installed, its version, and which
//! environment (development, production, test, script) it runs in. The
//! result is a plain value so callers and tests can construct any apparent
//! environment they need.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Variable naming the environment explicitly
pub const APP_ENV_VAR: &str = "APP_ENV";

/// Variable used by deployments to mark a staging space
pub const APPLICATION_ENVIRONMENT_VAR: &str = "APPLICATION_ENVIRONMENT";

#[derive(Debug, Error)]
pub enum AppEnvError {
    #[error("Cannot determine app root dir from executable location: {0}")]
    UnknownRoot(PathBuf),

    #[error("Cannot locate the running executable")]
    CurrentExe(#[source] std::io::Error),
}

/// Known environment names
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
    Script,
    Other(String),
}

impl From<&str> for Environment {
    fn from(s: &str) -> Self {
        match s {
            "development" => Self::Development,
            "production" => Self::Production,
            "test" => Self::Test,
            "script" => Self::Script,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
            Self::Test => f.write_str("test"),
            Self::Script => f.write_str("script"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Deployment tier used by server-side code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Development,
    Staging,
    Production,
}

/// Snapshot of the application's environment
#[derive(Clone, Debug)]
pub struct AppEnv {
    pub env: Option<Environment>,
    pub root_dir: PathBuf,
    pub main_file: PathBuf,
    pub version: Option<String>,
    pub application_environment: Option<String>,
}

impl AppEnv {
    /// Detect the environment of the running process
    pub fn detect() -> Result<Self, AppEnvError> {
        let main_file = std::env::current_exe().map_err(AppEnvError::CurrentExe)?;
        Self::resolve(main_file, |name| std::env::var(name).ok())
    }

    /// Resolve the environment for a given executable path and variable lookup
    pub fn resolve<F>(main_file: PathBuf, var: F) -> Result<Self, AppEnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_dir = root_dir(&main_file)?;
        let version = read_version(&root_dir);
        let env = var(APP_ENV_VAR)
            .filter(|s| !s.is_empty())
            .map(|s| Environment::from(s.as_str()))
            .or_else(|| infer_env(&main_file, &root_dir));

        Ok(Self {
            env,
            root_dir,
            main_file,
            version,
            application_environment: var(APPLICATION_ENVIRONMENT_VAR),
        })
    }

    /// An environment with no filesystem information, for callers that
    /// cannot or need not detect one
    pub fn with_env(env: Environment) -> Self {
        Self {
            env: Some(env),
            root_dir: PathBuf::new(),
            main_file: PathBuf::new(),
            version: None,
            application_environment: None,
        }
    }

    /// File stem of the executable, used as the logger name
    pub fn name(&self) -> Option<&str> {
        self.main_file.file_stem().and_then(|s| s.to_str())
    }

    pub fn is_dev(&self) -> bool {
        self.env == Some(Environment::Development)
    }

    pub fn is_prod(&self) -> bool {
        self.env == Some(Environment::Production)
    }

    pub fn is_test(&self) -> bool {
        self.env == Some(Environment::Test)
    }

    pub fn is_script(&self) -> bool {
        self.env == Some(Environment::Script)
    }

    pub fn is_staging(&self) -> bool {
        !self.is_dev() && self.application_environment.as_deref() == Some("staging")
    }

    pub fn tier(&self) -> Tier {
        if self.is_dev() {
            Tier::Development
        } else if self.is_staging() {
            Tier::Staging
        } else {
            Tier::Production
        }
    }
}

/// `<root>/target/<profile>/...` during development, `<root>/bin/<exe>` when installed
fn root_dir(main_file: &Path) -> Result<PathBuf, AppEnvError> {
    let dir = main_file
        .parent()
        .ok_or_else(|| AppEnvError::UnknownRoot(main_file.to_path_buf()))?;

    if let Some(target) = dir
        .ancestors()
        .find(|a| a.file_name().is_some_and(|n| n == "target"))
    {
        if let Some(root) = target.parent() {
            return Ok(root.to_path_buf());
        }
    }

    if dir.file_name().is_some_and(|n| n == "bin") {
        if let Some(root) = dir.parent() {
            return Ok(root.to_path_buf());
        }
    }

    Err(AppEnvError::UnknownRoot(dir.to_path_buf()))
}

fn read_version(root_dir: &Path) -> Option<String> {
    let manifest = std::fs::read_to_string(root_dir.join("Cargo.toml")).ok()?;
    let value: toml::Value = toml::from_str(&manifest).ok()?;

    let package_version = value
        .get("package")
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str());
    let workspace_version = || {
        value
            .get("workspace")
            .and_then(|w| w.get("package"))
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_str())
    };

    package_version.or_else(workspace_version).map(str::to_string)
}

fn infer_env(main_file: &Path, root_dir: &Path) -> Option<Environment> {
    if is_test_harness(main_file) {
        return Some(Environment::Test);
    }
    if main_file.starts_with(root_dir.join("bin")) || main_file.starts_with(root_dir.join("scripts"))
    {
        return Some(Environment::Script);
    }
    None
}

/// Cargo places test harnesses in `target/<profile>/deps/`
fn is_test_harness(main_file: &Path) -> bool {
    let Some(deps) = main_file.parent() else {
        return false;
    };
    deps.file_name().is_some_and(|n| n == "deps")
        && deps
            .ancestors()
            .any(|a| a.file_name().is_some_and(|n| n == "target"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_root_dir_from_cargo_target() {
        let env = AppEnv::resolve(PathBuf::from("/work/app/target/debug/app"), vars(&[])).unwrap();
        assert_eq!(env.root_dir, PathBuf::from("/work/app"));
        assert_eq!(env.env, None);
        assert_eq!(env.name(), Some("app"));
    }

    #[test]
    fn test_root_dir_from_bin_install() {
        let env = AppEnv::resolve(PathBuf::from("/opt/tools/bin/cfutil"), vars(&[])).unwrap();
        assert_eq!(env.root_dir, PathBuf::from("/opt/tools"));
        assert!(env.is_script());
    }

    #[test]
    fn test_root_dir_unknown() {
        let err = AppEnv::resolve(PathBuf::from("/usr/local/cfutil"), vars(&[])).unwrap_err();
        assert!(matches!(err, AppEnvError::UnknownRoot(_)));
    }

    #[test]
    fn test_test_harness_detected() {
        let env = AppEnv::resolve(
            PathBuf::from("/work/app/target/debug/deps/app-0123abcd"),
            vars(&[]),
        )
        .unwrap();
        assert!(env.is_test());
        assert_eq!(env.root_dir, PathBuf::from("/work/app"));
    }

    #[test]
    fn test_explicit_env_wins() {
        let env = AppEnv::resolve(
            PathBuf::from("/work/app/target/debug/deps/app-0123abcd"),
            vars(&[(APP_ENV_VAR, "production")]),
        )
        .unwrap();
        assert!(env.is_prod());
        assert!(!env.is_test());
    }

    #[test]
    fn test_other_env_name() {
        let env = AppEnv::resolve(
            PathBuf::from("/work/app/target/debug/app"),
            vars(&[(APP_ENV_VAR, "qa")]),
        )
        .unwrap();
        assert_eq!(env.env, Some(Environment::Other("qa".to_string())));
        assert!(!env.is_dev() && !env.is_prod() && !env.is_test() && !env.is_script());
    }

    #[test]
    fn test_version_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"app\"\nversion = \"1.2.3\"\n",
        )
        .unwrap();
        let exe = dir.path().join("target").join("release").join("app");

        let env = AppEnv::resolve(exe, vars(&[])).unwrap();
        assert_eq!(env.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_version_from_workspace_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            "[workspace]\nmembers = []\n\n[workspace.package]\nversion = \"0.4.0\"\n",
        )
        .unwrap();
        let exe = dir.path().join("bin").join("app");

        let env = AppEnv::resolve(exe, vars(&[])).unwrap();
        assert_eq!(env.version.as_deref(), Some("0.4.0"));
    }

    #[test]
    fn test_version_missing_manifest() {
        let env = AppEnv::resolve(PathBuf::from("/nonexistent/target/debug/app"), vars(&[])).unwrap();
        assert_eq!(env.version, None);
    }

    #[test]
    fn test_tier() {
        let exe = PathBuf::from("/work/app/target/debug/app");

        let dev = AppEnv::resolve(
            exe.clone(),
            vars(&[(APP_ENV_VAR, "development"), (APPLICATION_ENVIRONMENT_VAR, "staging")]),
        )
        .unwrap();
        assert_eq!(dev.tier(), Tier::Development);

        let staging =
            AppEnv::resolve(exe.clone(), vars(&[(APPLICATION_ENVIRONMENT_VAR, "staging")])).unwrap();
        assert!(staging.is_staging());
        assert_eq!(staging.tier(), Tier::Staging);

        let prod = AppEnv::resolve(exe, vars(&[])).unwrap();
        assert_eq!(prod.tier(), Tier::Production);
    }

    #[test]
    fn test_environment_display_round_trip() {
        for name in ["development", "production", "test", "script", "qa"] {
            assert_eq!(Environment::from(name).to_string(), name);
        }
    }
}
