//! Global constants used throughout the buildinputs codebase.
//!
//! This module contains source identifier schemes, attribute keys, environment
//! variable names and timeouts that are used across multiple modules. Defining
//! them centrally makes the wire-format strings discoverable in one place.

use std::time::Duration;

/// Scheme prefix of a source operation that pulls a remote base image.
pub const DOCKER_IMAGE_SCHEME: &str = "docker-image://";

/// Scheme prefix of a source operation that reads a local build context.
///
/// The remainder of the identifier is the context name: `context` for the
/// primary build context, anything else for a named secondary context.
pub const LOCAL_SCHEME: &str = "local://";

/// Name BuildKit gives the primary build context.
pub const PRIMARY_CONTEXT_NAME: &str = "context";

/// Metadata description key holding the human-readable step name
/// (e.g. `[stage-0 2/3] COPY foo /bar`).
pub const CUSTOM_NAME_KEY: &str = "llb.customname";

/// Digest algorithm prefix used for operation identities.
pub const DIGEST_ALGORITHM: &str = "sha256";

/// Environment variable carrying the target platform in `os/arch` form.
pub const TARGET_PLATFORM_ENV: &str = "TARGETPLATFORM";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "BUILDINPUTS_CONFIG";

/// Configuration file looked up in the working directory when no explicit
/// path is given.
pub const DEFAULT_CONFIG_FILE: &str = "buildinputs.toml";

/// Build argument every Dockerfile in the repository expects.
pub const BASE_IMAGE_ARG: &str = "BASE_IMAGE";

/// The only operating system the converter is asked to target.
pub const SUPPORTED_OS: &str = "linux";

/// Default converter program, looked up on `PATH`.
pub const DEFAULT_FRONTEND_PROGRAM: &str = "dockerfile2llb";

/// Timeout for a single Dockerfile conversion (300 seconds).
///
/// Conversion is CPU-bound and offline; a converter that runs longer than
/// this is almost certainly waiting on something it should not.
pub const DEFAULT_FRONTEND_TIMEOUT: Duration = Duration::from_secs(300);

/// Synthetic digest reported for every parent image by the stub resolver.
pub const STUB_IMAGE_DIGEST: &str =
    "sha256:a1c7d58d98df3f9a67eda799200655b923ebc7a41cad1d9bb52723ae1c81ad17";

/// Working directory declared by the stub parent image config.
pub const STUB_IMAGE_WORKDIR: &str = "/";
