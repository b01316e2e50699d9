//! Dependency extraction.
//!
//! Walks every node of a [`BuildGraph`] and collects the paths read straight
//! from a local build context:
//!
//! - **File** nodes: each `Copy` action whose secondary (copy-from) slot is a
//!   local context contributes its source path. The primary slot is the
//!   destination layer and says nothing about where data comes from; it is
//!   only checked to be in range.
//!   `Mkdir`, `Mkfile`, `Rm` and `Symlink` read nothing from the context.
//! - **Exec** nodes: each mount whose slot is a local context contributes its
//!   selector. This is how `RUN --mount=type=bind,src=...` reads the context
//!   without any `COPY`.
//! - Everything else is skipped.
//!
//! Raw extraction ([`extract`]) neither deduplicates nor orders. The
//! [`Dependencies`] boundary type canonicalizes and renders a sorted,
//! deduplicated list.

use std::collections::BTreeSet;
use tracing::debug;

use crate::core::Result;
use crate::graph::{BuildGraph, FileActionKind, Operation, OperationKind};
use crate::paths::canonicalize;
use crate::provenance::is_from_local_context;

/// Collect the raw context paths read by the graph.
///
/// The same path may appear several times (two steps copying it); order
/// carries no meaning.
///
/// # Errors
///
/// Propagates [`crate::core::BuildInputsError::MalformedGraph`] and
/// [`crate::core::BuildInputsError::UnsupportedSourceKind`] from slot
/// resolution and classification. No partial result is returned.
pub fn extract(graph: &BuildGraph) -> Result<Vec<String>> {
    let mut paths = Vec::new();

    for op in graph.iter() {
        match &op.kind {
            OperationKind::File(file) => {
                for (position, action) in file.actions.iter().enumerate() {
                    let FileActionKind::Copy { src, dest } = &action.kind else {
                        continue;
                    };
                    op.file_action_slot(action.input, position)?;
                    let slot = op.file_action_slot(action.secondary_input, position)?;
                    if is_from_local_context(&slot, graph)? {
                        log_dependency(op, src, &format!("copy to {dest}"));
                        paths.push(src.clone());
                    }
                }
            }
            OperationKind::Exec(exec) => {
                for mount in &exec.mounts {
                    let slot = op.input_slot(mount.input)?;
                    if is_from_local_context(&slot, graph)? {
                        let via = format!("{:?} mount at {}", mount.mount_type, mount.dest);
                        log_dependency(op, &mount.selector, &via);
                        paths.push(mount.selector.clone());
                    }
                }
            }
            OperationKind::Source(_) | OperationKind::Other(_) => {}
        }
    }

    Ok(paths)
}

fn log_dependency(op: &Operation, path: &str, via: &str) {
    match op.custom_name() {
        Some(step) => debug!("{} reads {:?} via {} ({})", op.digest.short(), path, via, step),
        None => debug!("{} reads {:?} via {}", op.digest.short(), path, via),
    }
}

/// Canonical, context-relative dependency paths of one build.
///
/// Internally unordered; [`Dependencies::paths`] imposes the sorted,
/// deduplicated order used at the output boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    paths: BTreeSet<String>,
}

impl Dependencies {
    /// Canonicalize raw extracted paths.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: raw.into_iter().map(|p| canonicalize(p.as_ref())).collect(),
        }
    }

    /// Sorted, deduplicated paths.
    pub fn paths(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

/// Extract and canonicalize the dependencies of a loaded graph.
pub fn dependencies(graph: &BuildGraph) -> Result<Dependencies> {
    Ok(Dependencies::from_raw(extract(graph)?))
}

/// Decode a serialized definition and return its dependencies.
///
/// This is the whole core in one call: load, extract, canonicalize.
pub fn analyze(definition: &[u8]) -> Result<Dependencies> {
    let graph = BuildGraph::load_definition(definition)?;
    let deps = dependencies(&graph)?;
    debug!("Found {} context dependencies in {} operations", deps.len(), graph.len());
    Ok(deps)
}
