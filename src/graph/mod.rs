//! Content-addressed build graph.
//!
//! Turns the flat list of serialized LLB records a converter emits into an
//! immutable table of [`Operation`]s keyed by [`Digest`]. The digest of each
//! node is computed from its raw bytes, never from the decoded structure, so
//! records that appear several times collapse into a single entry.
//!
//! Loading is all-or-nothing: a record that fails to decode, an input that
//! references a digest absent from the table, or a cycle aborts with
//! [`BuildInputsError::MalformedGraph`] and no graph is returned.
//!
//! Every analysis owns its own [`BuildGraph`]; there is no shared instance,
//! so independent analyses can run in parallel without coordination.
//!
//! # Example
//!
//! ```rust,no_run
//! use buildinputs::graph::BuildGraph;
//!
//! # fn example(bytes: &[u8]) -> buildinputs::core::Result<()> {
//! let graph = BuildGraph::load_definition(bytes)?;
//! for op in graph.iter() {
//!     println!("{} {}", op.digest.short(), op.kind.name());
//! }
//! # Ok(())
//! # }
//! ```

mod digest;

pub use digest::Digest;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use prost::Message;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::constants::CUSTOM_NAME_KEY;
use crate::core::{BuildInputsError, Result};
use crate::llb::{self, MountType};

/// A `(producer, output)` pair pointing at one output of another operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRef {
    /// Digest of the producing operation
    pub producer: Digest,
    /// Which output of the producer
    pub output: i64,
}

/// What feeds an input slot of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputRef {
    /// No upstream producer (slot index `-1`, e.g. `FROM scratch`).
    Scratch,
    /// An output of another operation.
    Output(OutputRef),
}

/// A node of the build graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Identity of the node, computed from its serialized bytes
    pub digest: Digest,
    /// Producers of this node's inputs; positions are referenced by slot index
    pub inputs: Vec<OutputRef>,
    /// Operation payload
    pub kind: OperationKind,
    /// Optional metadata from the definition, for diagnostics only
    pub metadata: Option<OperationMetadata>,
}

/// Payload of an [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// Imports content: a base image or a local context.
    Source(SourceOperation),
    /// Filesystem actions (copy, mkdir, ...).
    File(FileOperation),
    /// A process run with mounts.
    Exec(ExecOperation),
    /// Anything the analysis treats as inert.
    Other(OtherOperation),
}

impl OperationKind {
    /// Short lowercase name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source(_) => "source",
            Self::File(_) => "file",
            Self::Exec(_) => "exec",
            Self::Other(OtherOperation::Build) => "build",
            Self::Other(OtherOperation::Merge) => "merge",
            Self::Other(OtherOperation::Diff) => "diff",
            Self::Other(OtherOperation::Result) => "result",
        }
    }
}

/// Operation kinds without analysis rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherOperation {
    Build,
    Merge,
    Diff,
    /// The terminal node that only points at the final image state.
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOperation {
    /// Scheme-prefixed identifier, e.g. `local://context`
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOperation {
    pub actions: Vec<FileAction>,
}

/// One action of a [`FileOperation`] with its raw slot indices.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAction {
    /// Primary slot: the layer the action writes onto
    pub input: i64,
    /// Secondary slot: the side a copy reads from
    pub secondary_input: i64,
    pub kind: FileActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileActionKind {
    Copy { src: String, dest: String },
    Mkfile { path: String },
    Mkdir { path: String },
    Rm { path: String },
    Symlink { target: String, link: String },
    /// An action variant this model does not know.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecOperation {
    pub mounts: Vec<Mount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Slot index into the owning operation's inputs
    pub input: i64,
    /// Path inside the input that gets mounted
    pub selector: String,
    /// Mount point inside the container
    pub dest: String,
    pub mount_type: MountType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationMetadata {
    pub description: BTreeMap<String, String>,
}

impl Operation {
    /// Decode one serialized record.
    fn decode(bytes: &[u8], metadata: Option<&llb::OpMetadata>) -> Result<Self> {
        let digest = Digest::from_bytes(bytes);
        let op = llb::Op::decode(bytes).map_err(|e| {
            BuildInputsError::malformed(format!("failed to decode op {}: {e}", digest))
        })?;

        let inputs = op
            .inputs
            .iter()
            .map(|input| {
                Ok(OutputRef {
                    producer: Digest::parse(&input.digest)?,
                    output: input.index,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let kind = match op.op {
            Some(llb::op::Op::Source(source)) => OperationKind::Source(SourceOperation {
                identifier: source.identifier,
            }),
            Some(llb::op::Op::File(file)) => OperationKind::File(FileOperation {
                actions: file.actions.into_iter().map(FileAction::from).collect(),
            }),
            Some(llb::op::Op::Exec(exec)) => OperationKind::Exec(ExecOperation {
                mounts: exec.mounts.into_iter().map(Mount::from).collect(),
            }),
            Some(llb::op::Op::Build(_)) => OperationKind::Other(OtherOperation::Build),
            Some(llb::op::Op::Merge(_)) => OperationKind::Other(OtherOperation::Merge),
            Some(llb::op::Op::Diff(_)) => OperationKind::Other(OtherOperation::Diff),
            None => OperationKind::Other(OtherOperation::Result),
        };

        Ok(Self {
            digest,
            inputs,
            kind,
            metadata: metadata.map(|m| OperationMetadata {
                description: m.description.clone(),
            }),
        })
    }

    /// The human-readable step name recorded by the converter, if any.
    pub fn custom_name(&self) -> Option<&str> {
        self.metadata.as_ref()?.description.get(CUSTOM_NAME_KEY).map(String::as_str)
    }

    /// Resolve a slot index that must refer to one of this operation's inputs.
    ///
    /// # Errors
    ///
    /// [`BuildInputsError::MalformedGraph`] for indices other than `-1` that are
    /// outside `0..inputs.len()`.
    pub fn input_slot(&self, index: i64) -> Result<InputRef> {
        if index == -1 {
            return Ok(InputRef::Scratch);
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.inputs.get(i))
            .map(|output| InputRef::Output(output.clone()))
            .ok_or_else(|| {
                BuildInputsError::malformed(format!(
                    "op {} references input slot {index} but has {} inputs",
                    self.digest,
                    self.inputs.len()
                ))
            })
    }

    /// Resolve a slot index used by the file action at `position`.
    ///
    /// File actions may also read the result of an earlier action of the same
    /// operation: index `inputs.len() + k` names the output of action `k`.
    /// Such a slot resolves to this operation itself as the producer.
    pub fn file_action_slot(&self, index: i64, position: usize) -> Result<InputRef> {
        let input_count = self.inputs.len() as i64;
        if index < input_count {
            return self.input_slot(index);
        }

        let action = index - input_count;
        if action >= position as i64 {
            return Err(BuildInputsError::malformed(format!(
                "file action {position} of op {} references the output of action {action}",
                self.digest
            )));
        }

        Ok(InputRef::Output(OutputRef {
            producer: self.digest.clone(),
            output: action,
        }))
    }
}

impl From<llb::FileAction> for FileAction {
    fn from(action: llb::FileAction) -> Self {
        use llb::file_action::Action;

        let kind = match action.action {
            Some(Action::Copy(copy)) => FileActionKind::Copy {
                src: copy.src,
                dest: copy.dest,
            },
            Some(Action::Mkfile(mkfile)) => FileActionKind::Mkfile { path: mkfile.path },
            Some(Action::Mkdir(mkdir)) => FileActionKind::Mkdir { path: mkdir.path },
            Some(Action::Rm(rm)) => FileActionKind::Rm { path: rm.path },
            Some(Action::Symlink(symlink)) => FileActionKind::Symlink {
                target: symlink.oldpath,
                link: symlink.newpath,
            },
            None => FileActionKind::Unknown,
        };

        Self {
            input: action.input,
            secondary_input: action.secondary_input,
            kind,
        }
    }
}

impl From<llb::Mount> for Mount {
    fn from(mount: llb::Mount) -> Self {
        let mount_type = mount.mount_type();
        Self {
            input: mount.input,
            selector: mount.selector,
            dest: mount.dest,
            mount_type,
        }
    }
}

/// Immutable digest-keyed table of build graph nodes.
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    operations: HashMap<Digest, Operation>,
    /// Producers before consumers.
    order: Vec<Digest>,
}

impl BuildGraph {
    /// Build the table from serialized records and their metadata.
    ///
    /// # Errors
    ///
    /// [`BuildInputsError::MalformedGraph`] if a record cannot be decoded, an
    /// input references a digest that is not in the table, or the producer
    /// relation has a cycle.
    pub fn load<I, B>(records: I, metadata: &BTreeMap<String, llb::OpMetadata>) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut operations = HashMap::new();
        let mut insertion = Vec::new();
        let mut duplicates = 0usize;

        for record in records {
            let bytes = record.as_ref();
            let digest = Digest::from_bytes(bytes);
            if operations.contains_key(&digest) {
                duplicates += 1;
                continue;
            }
            let op = Operation::decode(bytes, metadata.get(digest.as_str()))?;
            insertion.push(digest.clone());
            operations.insert(digest, op);
        }

        let order = topological_order(&operations, &insertion)?;
        debug!("Loaded build graph with {} operations ({} duplicate records)", order.len(), duplicates);

        Ok(Self { operations, order })
    }

    /// Build the table from a decoded [`llb::Definition`].
    pub fn from_definition(definition: &llb::Definition) -> Result<Self> {
        Self::load(&definition.def, &definition.metadata)
    }

    /// Decode a serialized [`llb::Definition`] and build the table.
    pub fn load_definition(bytes: &[u8]) -> Result<Self> {
        let definition = llb::Definition::decode(bytes)
            .map_err(|e| BuildInputsError::malformed(format!("failed to decode definition: {e}")))?;
        Self::from_definition(&definition)
    }

    /// Look up a node by digest.
    pub fn get(&self, digest: &Digest) -> Option<&Operation> {
        self.operations.get(digest)
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// All nodes, producers before consumers.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.order.iter().filter_map(|digest| self.operations.get(digest))
    }
}

fn topological_order(
    operations: &HashMap<Digest, Operation>,
    insertion: &[Digest],
) -> Result<Vec<Digest>> {
    let mut graph: DiGraph<Digest, ()> = DiGraph::with_capacity(insertion.len(), 0);
    let mut indices: HashMap<&Digest, NodeIndex> = HashMap::with_capacity(insertion.len());
    for digest in insertion {
        indices.insert(digest, graph.add_node(digest.clone()));
    }

    for digest in insertion {
        let consumer = indices[digest];
        for input in &operations[digest].inputs {
            let producer = indices.get(&input.producer).ok_or_else(|| {
                BuildInputsError::malformed(format!(
                    "op {digest} references missing op {}",
                    input.producer
                ))
            })?;
            graph.add_edge(*producer, consumer, ());
        }
    }

    let sorted = toposort(&graph, None).map_err(|cycle| {
        BuildInputsError::malformed(format!("cycle through op {}", graph[cycle.node_id()]))
    })?;
    Ok(sorted.into_iter().map(|index| graph[index].clone()).collect())
}
