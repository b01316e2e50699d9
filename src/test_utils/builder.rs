//! Fabricates LLB definitions for tests.
//!
//! [`DefinitionBuilder`] emits ops the way the Dockerfile converter lays them
//! out: sources first, file and exec ops referencing earlier ops by digest,
//! and a terminal result op pointing at the final state.

use prost::Message;
use std::collections::BTreeMap;

use crate::constants::{CUSTOM_NAME_KEY, DOCKER_IMAGE_SCHEME, LOCAL_SCHEME};
use crate::graph::Digest;
use crate::llb::{
    self, ExecOp, FileAction, FileActionCopy, FileActionMkDir, FileActionMkFile, FileOp, Input,
    Meta, Mount, MountType, Op, OpMetadata, SourceOp, file_action,
};

/// One output of an op added to a [`DefinitionBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub digest: Digest,
    pub output: i64,
}

impl State {
    /// Wire reference to this state, for hand-built ops.
    pub fn input(&self) -> Input {
        Input {
            digest: self.digest.to_string(),
            index: self.output,
        }
    }
}

/// A `RUN --mount=type=bind,from=...,src=<selector>,dst=<dest>` mount.
#[derive(Debug, Clone, Copy)]
pub struct BindMount<'a> {
    pub from: &'a State,
    pub selector: &'a str,
    pub dest: &'a str,
}

/// Incrementally builds an [`llb::Definition`].
#[derive(Debug, Default)]
pub struct DefinitionBuilder {
    records: Vec<Vec<u8>>,
    metadata: BTreeMap<String, OpMetadata>,
}

impl DefinitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `FROM <reference>`
    pub fn image(&mut self, reference: &str) -> State {
        self.source(&format!("{DOCKER_IMAGE_SCHEME}{reference}"), &[])
    }

    /// A local context source, as the converter emits it for `COPY` sources.
    pub fn local(&mut self, name: &str) -> State {
        self.source(
            &format!("{LOCAL_SCHEME}{name}"),
            &[("local.sharedkeyhint", name), ("local.unique", "s4xc9o8pcx3bmnvr9dxtpddhy")],
        )
    }

    /// A source op with an arbitrary identifier.
    pub fn source(&mut self, identifier: &str, attrs: &[(&str, &str)]) -> State {
        self.push_op(Op {
            inputs: vec![],
            op: Some(llb::op::Op::Source(SourceOp {
                identifier: identifier.to_string(),
                attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            })),
            platform: None,
        })
    }

    /// `COPY [--from=<from>] <src> <dest>` onto `base` (`None` for scratch).
    pub fn copy(&mut self, base: Option<&State>, from: &State, src: &str, dest: &str) -> State {
        let (inputs, input, secondary_input) = match base {
            Some(base) => (vec![base.input(), from.input()], 0, 1),
            None => (vec![from.input()], -1, 0),
        };
        self.file_op(
            inputs,
            vec![FileAction {
                input,
                secondary_input,
                output: 0,
                action: Some(file_action::Action::Copy(FileActionCopy {
                    src: src.to_string(),
                    dest: dest.to_string(),
                    mode: -1,
                    follow_symlink: true,
                    dir_copy_contents: true,
                    create_dest_path: true,
                    allow_wildcard: true,
                    allow_empty_wildcard: true,
                    ..Default::default()
                })),
            }],
        )
    }

    /// `WORKDIR`-style directory creation.
    pub fn mkdir(&mut self, base: &State, path: &str) -> State {
        self.file_op(
            vec![base.input()],
            vec![FileAction {
                input: 0,
                secondary_input: -1,
                output: 0,
                action: Some(file_action::Action::Mkdir(FileActionMkDir {
                    path: path.to_string(),
                    mode: 0o755,
                    make_parents: true,
                })),
            }],
        )
    }

    /// Heredoc-style file creation.
    pub fn mkfile(&mut self, base: &State, path: &str, data: &[u8]) -> State {
        self.file_op(
            vec![base.input()],
            vec![FileAction {
                input: 0,
                secondary_input: -1,
                output: 0,
                action: Some(file_action::Action::Mkfile(FileActionMkFile {
                    path: path.to_string(),
                    mode: 0o644,
                    data: data.to_vec(),
                })),
            }],
        )
    }

    /// A file op with arbitrary inputs and actions.
    pub fn file_op(&mut self, inputs: Vec<Input>, actions: Vec<FileAction>) -> State {
        self.push_op(Op {
            inputs,
            op: Some(llb::op::Op::File(FileOp { actions })),
            platform: None,
        })
    }

    /// `RUN [--mount=type=bind,...] <args>` on `root` (`None` for scratch).
    pub fn run(&mut self, root: Option<&State>, args: &[&str], binds: &[BindMount<'_>]) -> State {
        let mut inputs = Vec::new();
        let mut mounts = Vec::new();

        let root_input = match root {
            Some(root) => {
                inputs.push(root.input());
                0
            }
            None => -1,
        };
        mounts.push(Mount {
            input: root_input,
            dest: "/".to_string(),
            output: 0,
            ..Default::default()
        });

        for bind in binds {
            inputs.push(bind.from.input());
            mounts.push(Mount {
                input: (inputs.len() - 1) as i64,
                selector: bind.selector.to_string(),
                dest: bind.dest.to_string(),
                output: -1,
                readonly: true,
                mount_type: MountType::Bind as i32,
            });
        }

        self.push_op(Op {
            inputs,
            op: Some(llb::op::Op::Exec(ExecOp {
                meta: Some(Meta {
                    args: args.iter().map(ToString::to_string).collect(),
                    env: vec!["PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string()],
                    cwd: "/".to_string(),
                    user: String::new(),
                }),
                mounts,
            })),
            platform: None,
        })
    }

    /// Encode and append an op, returning its first output.
    pub fn push_op(&mut self, op: Op) -> State {
        let bytes = op.encode_to_vec();
        let digest = Digest::from_bytes(&bytes);
        self.records.push(bytes);
        State { digest, output: 0 }
    }

    /// Attach an `llb.customname` description to the op behind `state`.
    pub fn describe(&mut self, state: &State, name: &str) {
        self.metadata
            .entry(state.digest.to_string())
            .or_default()
            .description
            .insert(CUSTOM_NAME_KEY.to_string(), name.to_string());
    }

    /// Append the terminal result op pointing at `result` and return the definition.
    pub fn finish(mut self, result: &State) -> llb::Definition {
        self.push_op(Op {
            inputs: vec![result.input()],
            op: None,
            platform: None,
        });
        self.build()
    }

    /// The definition as built so far, without a terminal op.
    pub fn build(self) -> llb::Definition {
        llb::Definition {
            def: self.records,
            metadata: self.metadata,
        }
    }
}

/// Serialize a definition the way a converter writes it to stdout.
pub fn encode_definition(definition: &llb::Definition) -> Vec<u8> {
    definition.encode_to_vec()
}
