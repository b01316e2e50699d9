//! External converter process.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use super::{ConvertRequest, Frontend, ResolvedImage, StubImageResolver};
use crate::config::FrontendConfig;
use crate::constants::BASE_IMAGE_ARG;
use crate::core::BuildInputsError;

/// Runs a Dockerfile-to-LLB converter once per Dockerfile.
///
/// The converter is invoked as
///
/// ```text
/// <program> [args...] --platform <os/arch> --image-config <file> \
///     --image-digest <digest> --build-arg K=V ... <dockerfile>
/// ```
///
/// and must write the serialized `Definition` to stdout. Its stderr is
/// forwarded line by line as warnings.
///
/// `--image-config` and `--image-digest` describe the parent image as
/// resolved by [`StubImageResolver`]; the converter is expected to use them
/// for every `FROM` instead of contacting a registry. No stock BuildKit tool
/// speaks this command line, so `program` is usually a thin wrapper around
/// the Dockerfile frontend.
#[derive(Debug, Clone)]
pub struct CommandFrontend {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandFrontend {
    /// Locate the configured converter on `PATH`.
    ///
    /// # Errors
    ///
    /// [`BuildInputsError::FrontendNotFound`] if the program cannot be found.
    pub fn from_config(config: &FrontendConfig) -> Result<Self> {
        let program = which::which(&config.program).map_err(|_| BuildInputsError::FrontendNotFound {
            program: config.program.clone(),
        })?;
        tracing::debug!("Using converter {}", program.display());

        Ok(Self {
            program,
            args: config.args.clone(),
            timeout: config.timeout(),
        })
    }

    fn command_args(
        &self,
        request: &ConvertRequest,
        image_config: &str,
        image: &ResolvedImage,
    ) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("--platform".to_string());
        args.push(request.platform.to_string());
        args.push("--image-config".to_string());
        args.push(image_config.to_string());
        args.push("--image-digest".to_string());
        args.push(image.digest.clone());
        for (key, value) in request.build_args.iter() {
            args.push("--build-arg".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(request.dockerfile.display().to_string());
        args
    }

    async fn run(&self, request: &ConvertRequest) -> Result<Vec<u8>> {
        let dockerfile = request.dockerfile.display().to_string();
        let failed = |reason: String| BuildInputsError::FrontendFailed {
            dockerfile: dockerfile.clone(),
            reason,
        };

        let resolver = StubImageResolver::new(request.platform.clone());
        let image = resolver.resolve(request.build_args.get(BASE_IMAGE_ARG).unwrap_or_default())?;
        tracing::debug!(
            "Parent image {:?} resolved to {} for {}",
            image.reference,
            image.digest,
            resolver.platform()
        );

        let mut image_config =
            tempfile::NamedTempFile::new().context("Failed to create image config file")?;
        image_config.write_all(&image.config).context("Failed to write image config file")?;

        let args = self.command_args(request, &image_config.path().display().to_string(), &image);
        tracing::debug!("Executing converter: {} {}", self.program.display(), args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| failed(format!("failed to start converter: {e}")))?,
            Err(_) => {
                tracing::warn!(
                    "Converter timed out after {} seconds: {}",
                    self.timeout.as_secs(),
                    dockerfile
                );
                return Err(failed(format!("timed out after {} seconds", self.timeout.as_secs()))
                    .into());
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::warn!("{}: {}", dockerfile, line);
        }

        if !output.status.success() {
            tracing::debug!("Converter failed with exit code: {:?}", output.status.code());
            let reason = match output.status.code() {
                Some(code) => format!("converter exited with status {code}"),
                None => "converter was terminated by a signal".to_string(),
            };
            let reason = match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) => format!("{reason}: {}", last.trim()),
                None => reason,
            };
            return Err(failed(reason).into());
        }

        tracing::debug!("Converter produced {} bytes for {}", output.stdout.len(), dockerfile);
        Ok(output.stdout)
    }
}

impl Frontend for CommandFrontend {
    async fn convert(&self, request: &ConvertRequest) -> Result<Vec<u8>> {
        self.run(request).await
    }
}
