//! Command-line interface for buildinputs.
//!
//! ```text
//! buildinputs [OPTIONS] <PATHS>...
//! ```
//!
//! For every Dockerfile on the command line the converter is run, the
//! resulting build graph is analyzed, and one JSON array of context-relative
//! paths is printed per line, in argument order:
//!
//! ```bash
//! TARGETPLATFORM=linux/amd64 buildinputs --build-arg BASE_IMAGE=fake-image \
//!     jupyter/minimal/ubi9-python-3.12/Dockerfile.cpu
//! ["jupyter/minimal/ubi9-python-3.12/start-notebook.sh","jupyter/utils"]
//! ```
//!
//! With `--changed-files`, each line is instead a rebuild decision:
//!
//! ```bash
//! git diff --name-only main | buildinputs --changed-files - Dockerfile.cpu
//! {"path":"Dockerfile.cpu","rebuild":true,"reason":"jupyter/utils/install.sh"}
//! ```
//!
//! Nothing is printed unless every input succeeds. Logs go to stderr so
//! stdout stays machine-readable; `--verbose` shows every dependency found
//! and the step that reads it.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use crate::changes::{parse_changed_files, rebuild_reason};
use crate::config::Config;
use crate::constants::{BASE_IMAGE_ARG, CONFIG_PATH_ENV};
use crate::core::BuildInputsError;
use crate::extractor::{Dependencies, analyze};
use crate::frontend::{
    BuildArgs, CommandFrontend, ConvertRequest, DefinitionFileFrontend, Frontend, Platform,
};

/// Runtime settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: Option<String>,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stderr log subscriber.
    ///
    /// `RUST_LOG` wins over the level chosen by `--verbose`/`--quiet`. Calling
    /// this more than once is harmless.
    pub fn init_logging(&self) {
        let filter = if std::env::var_os("RUST_LOG").is_some() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level.as_deref().unwrap_or("warn"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// List the build-context files each Dockerfile build reads.
#[derive(Parser, Debug)]
#[command(
    name = "buildinputs",
    version,
    about = "List the build-context files each Dockerfile build reads",
    long_about = "Converts each Dockerfile into its BuildKit build graph and prints, one JSON \
                  array per input, the build-context paths the build reads through COPY/ADD \
                  and RUN --mount. Use the output to decide whether a change requires a rebuild."
)]
pub struct Cli {
    /// Dockerfiles to analyze, or serialized build graphs with --definition.
    #[arg(required = true, value_name = "PATHS")]
    paths: Vec<PathBuf>,

    /// Build argument passed to the converter (repeatable).
    ///
    /// BASE_IMAGE is required; defaults can be set under [build_args] in the
    /// configuration file.
    #[arg(long = "build-arg", value_name = "KEY=VALUE")]
    build_args: Vec<String>,

    /// Target platform in os/arch form; only linux is supported.
    ///
    /// Defaults to the TARGETPLATFORM environment variable.
    #[arg(long, value_name = "OS/ARCH")]
    platform: Option<String>,

    /// Treat PATHS as serialized build graphs instead of Dockerfiles.
    ///
    /// The converter is not run, so --platform and --build-arg are rejected.
    #[arg(long, conflicts_with_all = ["build_args", "platform"])]
    definition: bool,

    /// Newline-separated list of changed files ("-" for stdin).
    ///
    /// Instead of dependency arrays, print one JSON object per input saying
    /// whether it must be rebuilt and which changed file caused it.
    #[arg(long, value_name = "FILE|-")]
    changed_files: Option<String>,

    /// Path to the configuration file (default: ./buildinputs.toml if present).
    #[arg(long, env = CONFIG_PATH_ENV, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show debug output, including each dependency and the step reading it.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

/// One `--changed-files` result line.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct RebuildDecision {
    path: String,
    rebuild: bool,
    reason: Option<String>,
}

impl Cli {
    /// Run the command and print results to stdout.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, cli_config: CliConfig) -> Result<()> {
        cli_config.init_logging();

        let config = Config::load_with_optional(cli_config.config_path).await?;
        let lines = self.run(&config).await?;

        for line in lines {
            println!("{line}");
        }
        Ok(())
    }

    /// Analyze every input and render the output lines.
    ///
    /// Returns as soon as one input fails; no lines are produced in that case.
    pub async fn run(&self, config: &Config) -> Result<Vec<String>> {
        let changed = match &self.changed_files {
            Some(source) => Some(read_changed_files(source).await?),
            None => None,
        };

        let results = if self.definition {
            self.analyze_all(&DefinitionFileFrontend, Platform::default(), BuildArgs::new()).await?
        } else {
            let platform = match &self.platform {
                Some(value) => value.parse()?,
                None => Platform::from_env()?,
            };
            let build_args = BuildArgs::parse(&self.build_args)?.with_defaults(&config.build_args);
            build_args.require(BASE_IMAGE_ARG)?;

            let frontend = CommandFrontend::from_config(&config.frontend)?;
            self.analyze_all(&frontend, platform, build_args).await?
        };

        results
            .into_iter()
            .map(|(path, deps)| render(&path, &deps, changed.as_deref()))
            .collect()
    }

    async fn analyze_all<F: Frontend>(
        &self,
        frontend: &F,
        platform: Platform,
        build_args: BuildArgs,
    ) -> Result<Vec<(PathBuf, Dependencies)>> {
        let mut results = Vec::with_capacity(self.paths.len());

        // Sequential so that output order matches argument order
        for path in &self.paths {
            let request = ConvertRequest {
                dockerfile: path.clone(),
                platform: platform.clone(),
                build_args: build_args.clone(),
            };
            let deps = analyze_one(frontend, &request)
                .await
                .with_context(|| format!("Failed to analyze {}", path.display()))?;
            tracing::debug!("{}: {} dependencies", path.display(), deps.len());
            results.push((path.clone(), deps));
        }

        Ok(results)
    }
}

async fn analyze_one<F: Frontend>(frontend: &F, request: &ConvertRequest) -> Result<Dependencies> {
    if !request.dockerfile.is_file() {
        return Err(BuildInputsError::FileSystemError {
            operation: "reading input".to_string(),
            path: request.dockerfile.display().to_string(),
        }
        .into());
    }
    let definition = frontend.convert(request).await?;
    Ok(analyze(&definition)?)
}

async fn read_changed_files(source: &str) -> Result<Vec<String>> {
    let text = if source == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read changed files from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(Path::new(source))
            .await
            .with_context(|| format!("Failed to read changed files from {source}"))?
    };
    Ok(parse_changed_files(&text))
}

fn render(path: &Path, deps: &Dependencies, changed: Option<&[String]>) -> Result<String> {
    let line = match changed {
        None => serde_json::to_string(&deps.paths())?,
        Some(changed) => {
            let reason = rebuild_reason(deps, changed);
            serde_json::to_string(&RebuildDecision {
                path: path.display().to_string(),
                rebuild: reason.is_some(),
                reason,
            })?
        }
    };
    Ok(line)
}
