//! Error handling for buildinputs
//!
//! This module provides the error taxonomy of the analyzer and the user-friendly
//! error reporting used by the CLI. The error system follows two principles:
//! 1. **Strongly-typed errors** so callers can tell a malformed graph from a
//!    converter failure
//! 2. **User-friendly messages** with actionable suggestions for CI logs
//!
//! # Architecture
//!
//! - [`BuildInputsError`] - Enumerated error types for every failure case
//! - [`ErrorContext`] - Wrapper that adds details and a suggestion
//!
//! The pure analysis core ([`crate::graph`], [`crate::provenance`],
//! [`crate::extractor`]) returns [`BuildInputsError`] directly. The outer
//! layers (frontend, config, CLI) use [`anyhow`] and attach context; use
//! [`user_friendly_error`] to turn any such error back into something
//! printable.
//!
//! Nothing is retried: every input is deterministic data, so a retry would
//! reproduce the same failure.
//!
//! # Examples
//!
//! ```rust,no_run
//! use buildinputs::core::{BuildInputsError, user_friendly_error};
//!
//! let error = BuildInputsError::UnsupportedSourceKind {
//!     identifier: "git://github.com/example/repo.git".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored output on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for buildinputs operations.
///
/// ## Graph analysis
/// - [`MalformedGraph`](Self::MalformedGraph) - undecodable record, dangling
///   digest or out-of-range input slot
/// - [`UnsupportedSourceKind`](Self::UnsupportedSourceKind) - a source
///   identifier with an unknown scheme
///
/// ## Entry contract
/// - [`MissingEnvVar`](Self::MissingEnvVar), [`InvalidPlatform`](Self::InvalidPlatform),
///   [`UnsupportedPlatform`](Self::UnsupportedPlatform)
/// - [`InvalidBuildArg`](Self::InvalidBuildArg), [`MissingBuildArg`](Self::MissingBuildArg)
///
/// ## Converter and environment
/// - [`FrontendNotFound`](Self::FrontendNotFound), [`FrontendFailed`](Self::FrontendFailed)
/// - [`ConfigError`](Self::ConfigError), [`FileSystemError`](Self::FileSystemError),
///   [`Other`](Self::Other)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildInputsError {
    /// The build graph cannot be decoded or violates a structural invariant.
    #[error("Malformed build graph: {reason}")]
    MalformedGraph {
        /// What was wrong with the graph
        reason: String,
    },

    /// A source operation uses an identifier scheme the analyzer does not know.
    ///
    /// Treated as fatal: guessing "not local" could hide a real dependency and
    /// guessing "local" would trigger builds for nothing.
    #[error("Unsupported source kind: {identifier}")]
    UnsupportedSourceKind {
        /// The full source identifier
        identifier: String,
    },

    /// A required environment variable is not set.
    #[error("{name} environment variable is required")]
    MissingEnvVar {
        /// Name of the variable
        name: String,
    },

    /// The target platform string is not of the form `os/arch`.
    #[error("Target platform format is invalid: {value:?}, should be os/arch")]
    InvalidPlatform {
        /// The rejected value
        value: String,
    },

    /// The target platform names an operating system other than linux.
    #[error("Operating system '{os}' is not supported")]
    UnsupportedPlatform {
        /// The rejected operating system
        os: String,
    },

    /// A `--build-arg` value is not of the form `KEY=VALUE`.
    #[error("Invalid build argument: {arg:?}")]
    InvalidBuildArg {
        /// The rejected argument
        arg: String,
    },

    /// A build argument the Dockerfiles rely on was not supplied.
    #[error("{name} build argument is required")]
    MissingBuildArg {
        /// Name of the build argument
        name: String,
    },

    /// The Dockerfile-to-graph converter program cannot be located.
    #[error("Build graph converter '{program}' not found")]
    FrontendNotFound {
        /// Program name or path as configured
        program: String,
    },

    /// The converter ran but did not produce a graph.
    #[error("Build graph conversion failed for {dockerfile}")]
    FrontendFailed {
        /// The Dockerfile being converted
        dockerfile: String,
        /// Why it failed (stderr, exit status or timeout)
        reason: String,
    },

    /// Configuration file problems.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Anything not covered above.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },

    /// Reading an input file failed.
    #[error("File system error during {operation}: {path}")]
    FileSystemError {
        /// What was being done
        operation: String,
        /// The affected path
        path: String,
    },
}

/// Result alias for the pure analysis core.
pub type Result<T, E = BuildInputsError> = std::result::Result<T, E>;

impl BuildInputsError {
    /// Shorthand for [`BuildInputsError::MalformedGraph`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedGraph {
            reason: reason.into(),
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: BuildInputsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: BuildInputsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Walks the `anyhow` chain looking for a [`BuildInputsError`]. When the typed
/// error sits deeper in the chain, the outermost context message (usually
/// naming the Dockerfile) is prepended to the details line.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for (depth, cause) in error.chain().enumerate() {
        if let Some(typed) = cause.downcast_ref::<BuildInputsError>() {
            let mut ctx = create_error_context(typed);
            if depth == 0 {
                return ctx;
            }
            // The outermost context names the input that failed
            let details = match ctx.details.take() {
                Some(inner) => format!("{error}: {inner}"),
                None => error.to_string(),
            };
            return ctx.with_details(details);
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(BuildInputsError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the configuration file");
    }

    // Unknown error: keep the full chain so nothing is lost in CI logs
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    let mut ctx = ErrorContext::new(BuildInputsError::Other {
        message: error.to_string(),
    });
    if !chain.is_empty() {
        ctx = ctx.with_details(chain.join(": "));
    }

    let not_found = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::NotFound);
    if not_found {
        ctx = ctx.with_suggestion("Check that the file exists and the path is correct");
    }
    ctx
}

fn create_error_context(error: &BuildInputsError) -> ErrorContext {
    match error {
        BuildInputsError::MalformedGraph { .. } => ErrorContext::new(error.clone())
            .with_details("The serialized build graph could not be interpreted")
            .with_suggestion(
                "Check that the converter and buildinputs agree on the LLB wire format",
            ),
        BuildInputsError::UnsupportedSourceKind { .. } => ErrorContext::new(error.clone())
            .with_details(
                "Only docker-image:// and local:// sources are understood; \
                 guessing could hide a real dependency",
            )
            .with_suggestion("Teach buildinputs about the new source kind before using it"),
        BuildInputsError::MissingEnvVar { name } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Set {name}, for example {name}=linux/amd64")),
        BuildInputsError::InvalidPlatform { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Use the os/arch form, for example linux/arm64"),
        BuildInputsError::UnsupportedPlatform { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Only linux targets are supported"),
        BuildInputsError::InvalidBuildArg { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Pass build arguments as --build-arg KEY=VALUE"),
        BuildInputsError::MissingBuildArg { name } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Pass --build-arg {name}=<image> or set it under [build_args] in the config file"
            )),
        BuildInputsError::FrontendNotFound { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Install the converter or set [frontend].program in buildinputs.toml; \
                 use --definition to analyze pre-converted graphs",
            ),
        BuildInputsError::FrontendFailed { reason, .. } => {
            ErrorContext::new(error.clone()).with_details(reason.clone())
        }
        BuildInputsError::ConfigError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check the configuration file passed with --config"),
        BuildInputsError::FileSystemError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check that the file exists and is readable"),
        BuildInputsError::Other { .. } => ErrorContext::new(error.clone()),
    }
}
