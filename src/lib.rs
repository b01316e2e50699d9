//! buildinputs - which build-context files does a Dockerfile build read?
//!
//! CI for a repository with many container images wants to rebuild an image
//! only when one of its inputs changed. Those inputs are the build-context
//! paths the build reads, which buildinputs finds by analyzing the BuildKit
//! build graph (LLB) a Dockerfile converts to, instead of parsing Dockerfiles
//! by hand.
//!
//! # Architecture Overview
//!
//! ```text
//! Dockerfile ──converter──▶ serialized Definition
//!                              │
//!                     graph::BuildGraph          (content-addressed table)
//!                              │
//!                     extractor::extract         (walk copies and mounts)
//!                              │    ▲
//!                              │    └── provenance::classify (single-hop)
//!                              ▼
//!                     extractor::Dependencies    (canonical, sorted)
//!                              │
//!                     changes::rebuild_reason    (optional)
//! ```
//!
//! A path is a dependency when a `COPY`/`ADD` reads it from a local context
//! (including named secondary contexts) or a `RUN --mount` binds it from one.
//! Copies from images or other stages are not dependencies of that step; a
//! stage that itself copied from the context reports those paths through its
//! own copy.
//!
//! # Core Modules
//!
//! ## Analysis
//! - [`llb`] - Wire model of the LLB protobuf messages
//! - [`graph`] - Digest-keyed build graph loaded from a definition
//! - [`provenance`] - Classifies what feeds an input slot
//! - [`extractor`] - Collects context paths from file and exec operations
//! - [`paths`] - Context-relative path canonicalization
//! - [`changes`] - Decides whether changed files require a rebuild
//!
//! ## Command line
//! - [`cli`] - Argument parsing and output rendering
//! - [`frontend`] - Runs the Dockerfile converter, or reads pre-converted graphs
//! - [`config`] - Optional `buildinputs.toml`
//! - [`core`] - Error taxonomy and user-facing error reporting
//! - [`constants`] - Wire-format strings and defaults
//!
//! # Example
//!
//! ```rust,no_run
//! # fn example(definition: &[u8]) -> buildinputs::core::Result<()> {
//! let deps = buildinputs::extractor::analyze(definition)?;
//! println!("{}", serde_json::to_string(&deps.paths()).unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Dependencies of two images, one JSON array per line
//! TARGETPLATFORM=linux/amd64 buildinputs --build-arg BASE_IMAGE=fake-image \
//!     jupyter/minimal/ubi9-python-3.12/Dockerfile.cpu \
//!     codeserver/ubi9-python-3.12/Dockerfile.cpu
//!
//! # Which of them does this pull request touch?
//! git diff --name-only origin/main | TARGETPLATFORM=linux/amd64 \
//!     buildinputs --build-arg BASE_IMAGE=fake-image --changed-files - */Dockerfile.cpu
//!
//! # Analyze graphs converted elsewhere
//! buildinputs --definition build/*.llb
//! ```

pub mod changes;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod extractor;
pub mod frontend;
pub mod graph;
pub mod llb;
pub mod paths;
pub mod provenance;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
