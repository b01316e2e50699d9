//! Test utilities for buildinputs
//!
//! Helpers for fabricating build graphs without a Dockerfile converter, and
//! for wiring tracing output into the test harness.
//!
//! # Example
//!
//! ```rust,no_run
//! use buildinputs::test_utils::DefinitionBuilder;
//!
//! let mut b = DefinitionBuilder::new();
//! let base = b.image("docker.io/library/fake-image:latest");
//! let context = b.local("context");
//! let step = b.copy(Some(&base), &context, "/app", "/opt/app");
//! let definition = b.finish(&step);
//! assert_eq!(definition.def.len(), 4);
//! ```

pub mod builder;

pub use builder::{BindMount, DefinitionBuilder, State, encode_definition};

use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::llb;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. `level` wins over `RUST_LOG`; with
/// neither set, tests stay silent.
///
/// ```bash
/// RUST_LOG=buildinputs=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Write an encoded definition to `dir/name` and return the path.
pub fn write_definition(
    dir: &Path,
    name: &str,
    definition: &llb::Definition,
) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, encode_definition(definition))?;
    Ok(path)
}

/// The graph a converter produces for a Dockerfile that copies from the
/// context, bind-mounts the context in a `RUN`, and copies from an image:
///
/// ```dockerfile
/// FROM ${BASE_IMAGE}
/// COPY codeserver/ubi9-python-3.12/test /opt/test
/// COPY --from=registry.access.redhat.com/ubi9/ubi /etc/yum.repos.d/ubi.repo /etc/yum.repos.d/
/// RUN --mount=type=bind,src=foo,dst=/bar ls /bar
/// ```
pub fn sample_definition() -> llb::Definition {
    let mut b = DefinitionBuilder::new();
    let base = b.image("docker.io/library/fake-image:latest");
    let context = b.local("context");
    let ubi = b.image("registry.access.redhat.com/ubi9/ubi:latest");

    let step = b.copy(Some(&base), &context, "/codeserver/ubi9-python-3.12/test", "/opt/test");
    b.describe(&step, "[1/3] COPY codeserver/ubi9-python-3.12/test /opt/test");
    let step =
        b.copy(Some(&step), &ubi, "/etc/yum.repos.d/ubi.repo", "/etc/yum.repos.d/ubi.repo");
    let step = b.run(
        Some(&step),
        &["/bin/sh", "-c", "ls /bar"],
        &[BindMount {
            from: &context,
            selector: "foo",
            dest: "/bar",
        }],
    );
    b.finish(&step)
}
