//! Dockerfile-to-graph conversion.
//!
//! The analyzer itself only understands serialized build graphs. This module
//! is the boundary to whatever produces them:
//!
//! - [`CommandFrontend`] runs an external converter program per Dockerfile
//! - [`DefinitionFileFrontend`] reads graphs that were converted earlier
//!
//! Both implement [`Frontend`], so the CLI does not care which one it drives.
//!
//! A conversion request carries the target [`Platform`] and the
//! [`BuildArgs`]. Parent images are never pulled: the converter is handed the
//! metadata fabricated by [`StubImageResolver`] instead.

mod command;
mod resolver;

pub use command::CommandFrontend;
pub use resolver::{ResolvedImage, StubImageResolver};

use anyhow::Context;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{SUPPORTED_OS, TARGET_PLATFORM_ENV};
use crate::core::{BuildInputsError, Result};

/// Target platform of a conversion, `os/arch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
}

impl Platform {
    /// Read the platform from `TARGETPLATFORM`.
    ///
    /// # Errors
    ///
    /// [`BuildInputsError::MissingEnvVar`] when unset, otherwise whatever
    /// [`Platform::from_str`] rejects.
    pub fn from_env() -> Result<Self> {
        let value = std::env::var(TARGET_PLATFORM_ENV).map_err(|_| {
            BuildInputsError::MissingEnvVar {
                name: TARGET_PLATFORM_ENV.to_string(),
            }
        })?;
        value.parse()
    }
}

impl Default for Platform {
    /// `linux/amd64`
    fn default() -> Self {
        Self {
            os: SUPPORTED_OS.to_string(),
            architecture: "amd64".to_string(),
        }
    }
}

impl FromStr for Platform {
    type Err = BuildInputsError;

    /// Parse `os/arch`. Exactly two non-empty parts are accepted and the
    /// operating system must be linux.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        let [os, architecture] = parts.as_slice() else {
            return Err(BuildInputsError::InvalidPlatform {
                value: s.to_string(),
            });
        };
        if os.is_empty() || architecture.is_empty() {
            return Err(BuildInputsError::InvalidPlatform {
                value: s.to_string(),
            });
        }
        if *os != SUPPORTED_OS {
            return Err(BuildInputsError::UnsupportedPlatform { os: os.to_string() });
        }
        Ok(Self {
            os: os.to_string(),
            architecture: architecture.to_string(),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)
    }
}

/// `--build-arg` values handed to the converter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    args: BTreeMap<String, String>,
}

impl BuildArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `KEY=VALUE` strings, splitting on the first `=`.
    ///
    /// Later occurrences of a key override earlier ones.
    ///
    /// # Errors
    ///
    /// [`BuildInputsError::InvalidBuildArg`] for an argument without `=` or
    /// with an empty key.
    pub fn parse<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = Self::new();
        for arg in raw {
            let arg = arg.as_ref();
            match arg.split_once('=') {
                Some((key, value)) if !key.is_empty() => args.set(key, value),
                _ => {
                    return Err(BuildInputsError::InvalidBuildArg {
                        arg: arg.to_string(),
                    });
                }
            }
        }
        Ok(args)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.args.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// `self` on top of `defaults`: keys present in both keep `self`'s value.
    #[must_use]
    pub fn with_defaults(self, defaults: &BTreeMap<String, String>) -> Self {
        let mut args = defaults.clone();
        args.extend(self.args);
        Self { args }
    }

    /// Fail unless `key` is present.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| BuildInputsError::MissingBuildArg {
            name: key.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One Dockerfile to convert.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub dockerfile: PathBuf,
    pub platform: Platform,
    pub build_args: BuildArgs,
}

/// Produces a serialized build graph for a Dockerfile.
pub trait Frontend {
    /// Convert one Dockerfile into a serialized `Definition`.
    fn convert(&self, request: &ConvertRequest)
    -> impl Future<Output = anyhow::Result<Vec<u8>>> + Send;
}

/// Treats every input path as an already-serialized `Definition`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionFileFrontend;

impl DefinitionFileFrontend {
    pub async fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read build definition {}", path.display()))
    }
}

impl Frontend for DefinitionFileFrontend {
    async fn convert(&self, request: &ConvertRequest) -> anyhow::Result<Vec<u8>> {
        self.read(&request.dockerfile).await
    }
}
