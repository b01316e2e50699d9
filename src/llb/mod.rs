//! BuildKit LLB wire model.
//!
//! Protobuf messages of the low-level build graph ("LLB") a Dockerfile
//! compiles to. Only the fields the analyzer reads, plus the ones needed to
//! fabricate realistic graphs in tests, are declared; `prost` skips unknown
//! fields when decoding, so graphs produced by newer converters still load.
//!
//! Field tags follow `solver/pb/ops.proto` from BuildKit.
//!
//! A serialized [`Definition`] is what a converter writes: `def` holds one
//! serialized [`Op`] per node (the last one being the terminal result op) and
//! `metadata` maps each node's digest to its [`OpMetadata`].

use std::collections::BTreeMap;

/// A marshalled build graph.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Definition {
    /// Serialized [`Op`] records, one per node.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub def: Vec<Vec<u8>>,
    /// Per-node metadata keyed by `sha256:<hex>` digest.
    #[prost(btree_map = "string, message", tag = "2")]
    pub metadata: BTreeMap<String, OpMetadata>,
}

/// A single node of the build graph.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Op {
    /// Producers of this op's inputs, referenced by position elsewhere.
    #[prost(message, repeated, tag = "1")]
    pub inputs: Vec<Input>,
    /// The operation payload; `None` for the terminal result op.
    #[prost(oneof = "op::Op", tags = "2, 3, 4, 5, 6, 7")]
    pub op: Option<op::Op>,
    #[prost(message, optional, tag = "10")]
    pub platform: Option<Platform>,
}

/// Nested types of [`Op`].
pub mod op {
    /// Operation payload variants.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(message, tag = "2")]
        Exec(super::ExecOp),
        #[prost(message, tag = "3")]
        Source(super::SourceOp),
        #[prost(message, tag = "4")]
        File(super::FileOp),
        #[prost(message, tag = "5")]
        Build(super::BuildOp),
        #[prost(message, tag = "6")]
        Merge(super::MergeOp),
        #[prost(message, tag = "7")]
        Diff(super::DiffOp),
    }
}

/// Reference to one output of another op.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Input {
    #[prost(string, tag = "1")]
    pub digest: String,
    #[prost(int64, tag = "2")]
    pub index: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Platform {
    #[prost(string, tag = "1")]
    pub architecture: String,
    #[prost(string, tag = "2")]
    pub os: String,
    #[prost(string, tag = "3")]
    pub variant: String,
}

/// Imports content from outside the build: an image, a local directory, git, http...
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SourceOp {
    #[prost(string, tag = "1")]
    pub identifier: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub attrs: BTreeMap<String, String>,
}

/// Runs a process with a set of mounts.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecOp {
    #[prost(message, optional, tag = "1")]
    pub meta: Option<Meta>,
    #[prost(message, repeated, tag = "2")]
    pub mounts: Vec<Mount>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Meta {
    #[prost(string, repeated, tag = "1")]
    pub args: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub env: Vec<String>,
    #[prost(string, tag = "3")]
    pub cwd: String,
    #[prost(string, tag = "4")]
    pub user: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Mount {
    /// Index into the owning op's inputs, `-1` for scratch.
    #[prost(int64, tag = "1")]
    pub input: i64,
    /// Path inside the input that is mounted.
    #[prost(string, tag = "2")]
    pub selector: String,
    #[prost(string, tag = "3")]
    pub dest: String,
    /// Output index, `-1` when the mount produces no output.
    #[prost(int64, tag = "4")]
    pub output: i64,
    #[prost(bool, tag = "5")]
    pub readonly: bool,
    #[prost(enumeration = "MountType", tag = "6")]
    pub mount_type: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MountType {
    Bind = 0,
    Secret = 1,
    Ssh = 2,
    Cache = 3,
    Tmpfs = 4,
}

/// A sequence of filesystem actions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileOp {
    #[prost(message, repeated, tag = "2")]
    pub actions: Vec<FileAction>,
}

/// One filesystem action.
///
/// `input` and `secondary_input` index the owning op's inputs; an index past
/// the end refers to the output of an earlier action (`index - inputs.len()`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileAction {
    #[prost(int64, tag = "1")]
    pub input: i64,
    #[prost(int64, tag = "2")]
    pub secondary_input: i64,
    #[prost(int64, tag = "3")]
    pub output: i64,
    #[prost(oneof = "file_action::Action", tags = "4, 5, 6, 7, 8")]
    pub action: Option<file_action::Action>,
}

/// Nested types of [`FileAction`].
pub mod file_action {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Action {
        #[prost(message, tag = "4")]
        Copy(super::FileActionCopy),
        #[prost(message, tag = "5")]
        Mkfile(super::FileActionMkFile),
        #[prost(message, tag = "6")]
        Mkdir(super::FileActionMkDir),
        #[prost(message, tag = "7")]
        Rm(super::FileActionRm),
        #[prost(message, tag = "8")]
        Symlink(super::FileActionSymlink),
    }
}

/// Copies `src` from the secondary input to `dest` on the primary input.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileActionCopy {
    #[prost(string, tag = "1")]
    pub src: String,
    #[prost(string, tag = "2")]
    pub dest: String,
    #[prost(int32, tag = "4")]
    pub mode: i32,
    #[prost(bool, tag = "5")]
    pub follow_symlink: bool,
    #[prost(bool, tag = "6")]
    pub dir_copy_contents: bool,
    #[prost(bool, tag = "8")]
    pub create_dest_path: bool,
    #[prost(bool, tag = "9")]
    pub allow_wildcard: bool,
    #[prost(bool, tag = "10")]
    pub allow_empty_wildcard: bool,
    #[prost(string, repeated, tag = "12")]
    pub include_patterns: Vec<String>,
    #[prost(string, repeated, tag = "13")]
    pub exclude_patterns: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileActionMkFile {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(int32, tag = "2")]
    pub mode: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileActionMkDir {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(int32, tag = "2")]
    pub mode: i32,
    #[prost(bool, tag = "3")]
    pub make_parents: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileActionRm {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(bool, tag = "2")]
    pub allow_not_found: bool,
    #[prost(bool, tag = "3")]
    pub allow_wildcard: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileActionSymlink {
    #[prost(string, tag = "1")]
    pub oldpath: String,
    #[prost(string, tag = "2")]
    pub newpath: String,
}

/// Nested frontend invocation (`#syntax=` directives and the like).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildOp {
    #[prost(int64, tag = "1")]
    pub builder: i64,
    #[prost(btree_map = "string, string", tag = "4")]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MergeOp {
    #[prost(message, repeated, tag = "1")]
    pub inputs: Vec<MergeInput>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MergeInput {
    #[prost(int64, tag = "1")]
    pub input: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiffOp {
    #[prost(message, optional, tag = "1")]
    pub lower: Option<MergeInput>,
    #[prost(message, optional, tag = "2")]
    pub upper: Option<MergeInput>,
}

/// Per-node metadata that does not affect the node's digest.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpMetadata {
    #[prost(bool, tag = "1")]
    pub ignore_cache: bool,
    /// Free-form descriptions, e.g. `llb.customname`.
    #[prost(btree_map = "string, string", tag = "2")]
    pub description: BTreeMap<String, String>,
    #[prost(btree_map = "string, bool", tag = "5")]
    pub caps: BTreeMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_unknown_fields_are_skipped() {
        // An Op carrying a WorkerConstraints message (tag 11) the model does not declare
        let mut bytes = Op {
            inputs: vec![],
            op: Some(op::Op::Source(SourceOp {
                identifier: "local://context".to_string(),
                attrs: BTreeMap::new(),
            })),
            platform: None,
        }
        .encode_to_vec();
        // field 11, wire type 2 (length-delimited), empty payload
        bytes.extend_from_slice(&[0x5a, 0x00]);

        let decoded = Op::decode(bytes.as_slice()).unwrap();
        match decoded.op {
            Some(op::Op::Source(source)) => assert_eq!(source.identifier, "local://context"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_terminal_op_has_no_payload() {
        let terminal = Op {
            inputs: vec![Input {
                digest: "sha256:00".to_string(),
                index: 0,
            }],
            op: None,
            platform: None,
        };
        let decoded = Op::decode(terminal.encode_to_vec().as_slice()).unwrap();
        assert!(decoded.op.is_none());
        assert_eq!(decoded.inputs.len(), 1);
    }

    #[test]
    fn test_mount_type_defaults_to_bind() {
        let mount = Mount::default();
        assert_eq!(mount.mount_type(), MountType::Bind);
    }
}
