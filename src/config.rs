use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "cfutil.toml";

/// Settings read from `cfutil.toml`
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// cf executable, resolved on PATH when bare
    pub cf_binary: PathBuf,
    pub logs: LogsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cf_binary: PathBuf::from("cf"),
            logs: LogsConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogsConfig {
    /// Join lines split across reads; `false` splits every read on its own
    pub buffer_partial_lines: bool,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            buffer_partial_lines: true,
        }
    }
}

impl Config {
    /// Load an explicitly requested file, or `cfutil.toml` in `dir` if it
    /// exists.
    ///
    /// An explicit file must exist and parse. A broken default file is
    /// reported and ignored.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            return toml::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()));
        }

        let path = dir.join(DEFAULT_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config"),
            },
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config"),
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cf_binary, PathBuf::from("cf"));
        assert!(config.logs.buffer_partial_lines);
    }

    #[test]
    fn test_load_default_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "cf_binary = \"/opt/cf/bin/cf\"\n\n[logs]\nbuffer_partial_lines = false\n",
        )
        .unwrap();

        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.cf_binary, PathBuf::from("/opt/cf/bin/cf"));
        assert!(!config.logs.buffer_partial_lines);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[logs]\n").unwrap();

        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_default_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "cf_binary = [").unwrap();

        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "cf_binary = \"cf7\"\n").unwrap();

        let config = Config::load(Some(&path), Path::new("/nonexistent")).unwrap();
        assert_eq!(config.cf_binary, PathBuf::from("cf7"));
        assert!(config.logs.buffer_partial_lines);
    }

    #[test]
    fn test_explicit_file_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::load(Some(&missing), dir.path()).is_err());

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[logs]\nbuffer_partial_lines = \"yes\"\n").unwrap();
        let err = Config::load(Some(&invalid), dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config"));
    }
}
