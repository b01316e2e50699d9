//! Configuration for buildinputs.
//!
//! Everything here is optional: without a configuration file the converter is
//! `dockerfile2llb` from `PATH` with a 300 second timeout and no default build
//! arguments.
//!
//! # Location
//!
//! 1. `--config <FILE>` or `BUILDINPUTS_CONFIG` (must exist)
//! 2. `buildinputs.toml` in the working directory (used when present)
//!
//! # Format
//!
//! ```toml
//! [frontend]
//! program = "dockerfile2llb"
//! args = ["--target", "cpu"]
//! timeout_secs = 300
//!
//! # Defaults for --build-arg; the command line wins
//! [build_args]
//! BASE_IMAGE = "fake-image"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{DEFAULT_CONFIG_FILE, DEFAULT_FRONTEND_PROGRAM, DEFAULT_FRONTEND_TIMEOUT};
use crate::core::BuildInputsError;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Converter settings
    #[serde(default)]
    pub frontend: FrontendConfig,

    /// Default build arguments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,
}

/// How to run the Dockerfile converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrontendConfig {
    /// Program name looked up on `PATH`, or a path
    #[serde(default = "default_program")]
    pub program: String,

    /// Extra arguments placed before the generated ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Per-Dockerfile conversion timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    DEFAULT_FRONTEND_PROGRAM.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_FRONTEND_TIMEOUT.as_secs()
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FrontendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from an explicit path, or from `buildinputs.toml` in the working
    /// directory if it exists, or fall back to defaults.
    ///
    /// # Errors
    ///
    /// - an explicit path that does not exist
    /// - unreadable file, invalid TOML, or values rejected by [`Config::validate`]
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(BuildInputsError::ConfigError {
                        message: format!("configuration file {} does not exist", path.display()),
                    }
                    .into());
                }
                Self::load_from(&path).await
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(&path).await
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file path.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject values that can never work.
    pub fn validate(&self) -> Result<(), BuildInputsError> {
        if self.frontend.program.trim().is_empty() {
            return Err(BuildInputsError::ConfigError {
                message: "frontend.program must not be empty".to_string(),
            });
        }
        if self.frontend.timeout_secs == 0 {
            return Err(BuildInputsError::ConfigError {
                message: "frontend.timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.frontend.program, "dockerfile2llb");
        assert_eq!(config.frontend.timeout(), Duration::from_secs(300));
        assert!(config.frontend.args.is_empty());
        assert!(config.build_args.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("buildinputs.toml");
        std::fs::write(
            &path,
            r#"
[frontend]
program = "/opt/bin/dockerfile2llb"
args = ["--target", "cpu"]

[build_args]
BASE_IMAGE = "fake-image"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).await.unwrap();
        assert_eq!(config.frontend.program, "/opt/bin/dockerfile2llb");
        assert_eq!(config.frontend.args, vec!["--target", "cpu"]);
        assert_eq!(config.frontend.timeout_secs, 300);
        assert_eq!(config.build_args.get("BASE_IMAGE").map(String::as_str), Some("fake-image"));
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load_with_optional(Some(temp.path().join("nope.toml"))).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildInputsError>(),
            Some(BuildInputsError::ConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "[frontend\nprogram = ").unwrap();
        let err = Config::load_from(&path).await.unwrap_err();
        assert!(err.downcast_ref::<toml::de::Error>().is_some());
    }

    #[tokio::test]
    async fn test_unknown_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("typo.toml");
        std::fs::write(&path, "[frontend]\nprogramm = \"x\"\n").unwrap();
        assert!(Config::load_from(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_timeout_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("zero.toml");
        std::fs::write(&path, "[frontend]\ntimeout_secs = 0\n").unwrap();
        let err = Config::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_serialize_roundtrip_defaults() {
        let text = toml::to_string(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
