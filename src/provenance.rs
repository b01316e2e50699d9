//! Provenance classification of input slots.
//!
//! Answers one question for the extractor: does the content arriving through
//! this slot come straight from a local build context?
//!
//! Classification is single-hop. Only the immediate producer of the slot is
//! inspected; a slot fed by another build stage is reported as
//! [`Provenance::Stage`] even if that stage itself copied from the context.
//! Those context reads are found when the other stage's own operations are
//! visited.

use std::fmt;
use tracing::trace;

use crate::constants::{DOCKER_IMAGE_SCHEME, LOCAL_SCHEME, PRIMARY_CONTEXT_NAME};
use crate::core::{BuildInputsError, Result};
use crate::graph::{BuildGraph, Digest, InputRef, OperationKind};

/// Where the content of an input slot comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// No producer at all.
    Scratch,
    /// A local build context; `name` is `context` for the primary one.
    LocalContext { name: String },
    /// A remote base image.
    RemoteImage { reference: String },
    /// Any non-source operation, i.e. another build step or stage.
    Stage { producer: Digest },
}

impl Provenance {
    /// Whether paths read through this slot are build-context dependencies.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::LocalContext { .. })
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scratch => f.write_str("scratch"),
            Self::LocalContext { name } => write!(f, "local context '{name}'"),
            Self::RemoteImage { reference } => write!(f, "image {reference}"),
            Self::Stage { producer } => write!(f, "stage op {}", producer.short()),
        }
    }
}

/// Parsed form of a source operation identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    DockerImage(String),
    Local(String),
}

impl SourceKind {
    /// Parse a scheme-prefixed source identifier.
    ///
    /// # Errors
    ///
    /// [`BuildInputsError::UnsupportedSourceKind`] for any scheme other than
    /// `docker-image://` and `local://`.
    pub fn parse(identifier: &str) -> Result<Self> {
        if let Some(reference) = identifier.strip_prefix(DOCKER_IMAGE_SCHEME) {
            return Ok(Self::DockerImage(reference.to_string()));
        }
        if let Some(name) = identifier.strip_prefix(LOCAL_SCHEME) {
            let name = if name.is_empty() { PRIMARY_CONTEXT_NAME } else { name };
            return Ok(Self::Local(name.to_string()));
        }
        Err(BuildInputsError::UnsupportedSourceKind {
            identifier: identifier.to_string(),
        })
    }
}

/// Classify the producer of `slot`.
///
/// # Errors
///
/// - [`BuildInputsError::MalformedGraph`] if the producer is not in `graph`
/// - [`BuildInputsError::UnsupportedSourceKind`] if the producer is a source
///   with an unknown scheme
pub fn classify(slot: &InputRef, graph: &BuildGraph) -> Result<Provenance> {
    let output = match slot {
        InputRef::Scratch => return Ok(Provenance::Scratch),
        InputRef::Output(output) => output,
    };

    let producer = graph.get(&output.producer).ok_or_else(|| {
        BuildInputsError::malformed(format!("input references missing op {}", output.producer))
    })?;

    let provenance = match &producer.kind {
        OperationKind::Source(source) => match SourceKind::parse(&source.identifier)? {
            SourceKind::Local(name) => Provenance::LocalContext { name },
            SourceKind::DockerImage(reference) => Provenance::RemoteImage { reference },
        },
        _ => Provenance::Stage {
            producer: producer.digest.clone(),
        },
    };

    trace!("Slot {}:{} comes from {}", output.producer.short(), output.output, provenance);
    Ok(provenance)
}

/// Whether `slot` is fed directly by a local build context.
///
/// Any named context counts, not only the primary one: every local context is
/// a cache-relevant input of the build.
pub fn is_from_local_context(slot: &InputRef, graph: &BuildGraph) -> Result<bool> {
    Ok(classify(slot, graph)?.is_local())
}
