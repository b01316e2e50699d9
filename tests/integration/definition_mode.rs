//! Analysis of pre-converted build graphs (`--definition`).

use buildinputs::test_utils::{BindMount, DefinitionBuilder, sample_definition};
use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_copy_and_bind_mount_dependencies() {
    let project = TestProject::new();
    project.definition("def.pb", &sample_definition());

    project
        .cmd()
        .args(["--definition", "def.pb"])
        .assert()
        .success()
        .stdout("[\"codeserver/ubi9-python-3.12/test\",\"foo\"]\n");
}

#[test]
fn test_copy_from_image_is_not_a_dependency() {
    // COPY --from=registry.access.redhat.com/ubi9/ubi /etc/yum.repos.d/ubi.repo ...
    let mut b = DefinitionBuilder::new();
    let base = b.image("docker.io/library/fake-image:latest");
    let ubi = b.image("registry.access.redhat.com/ubi9/ubi:latest");
    let step = b.copy(Some(&base), &ubi, "/etc/yum.repos.d/ubi.repo", "/etc/yum.repos.d/ubi.repo");

    let project = TestProject::new();
    project.definition("def.pb", &b.finish(&step));

    project.cmd().args(["--definition", "def.pb"]).assert().success().stdout("[]\n");
}

#[test]
fn test_bind_mount_from_stage_is_not_a_dependency() {
    // FROM fake-image AS build
    // RUN mkdir /build
    // FROM fake-image
    // RUN --mount=type=bind,from=build,src=/build,dst=/mnt ls /mnt
    let mut b = DefinitionBuilder::new();
    let base = b.image("docker.io/library/fake-image:latest");
    let build = b.mkdir(&base, "/build");
    let run = b.run(
        Some(&base),
        &["/bin/sh", "-c", "ls /mnt"],
        &[BindMount {
            from: &build,
            selector: "/build",
            dest: "/mnt",
        }],
    );

    let project = TestProject::new();
    project.definition("def.pb", &b.finish(&run));

    project.cmd().args(["--definition", "def.pb"]).assert().success().stdout("[]\n");
}

#[test]
fn test_empty_graph_prints_empty_array() {
    let project = TestProject::new();
    project.write("empty.pb", "");

    project.cmd().args(["--definition", "empty.pb"]).assert().success().stdout("[]\n");
}

#[test]
fn test_one_line_per_input_in_argument_order() {
    let mut b = DefinitionBuilder::new();
    let base = b.image("docker.io/library/fake-image:latest");
    let context = b.local("context");
    let step = b.copy(Some(&base), &context, "/requirements.txt", "/opt/app/");
    let step = b.copy(Some(&step), &context, "/utils", "/opt/app/utils");
    let step = b.copy(Some(&step), &context, "/utils", "/opt/other/utils");

    let project = TestProject::new();
    project.definition("second.pb", &b.finish(&step));
    project.definition("first.pb", &sample_definition());

    project
        .cmd()
        .args(["--definition", "first.pb", "second.pb"])
        .assert()
        .success()
        .stdout(
            "[\"codeserver/ubi9-python-3.12/test\",\"foo\"]\n[\"requirements.txt\",\"utils\"]\n",
        );
}

#[test]
fn test_unsupported_source_fails() {
    let mut b = DefinitionBuilder::new();
    let base = b.image("docker.io/library/fake-image:latest");
    let git = b.source("git://github.com/opendatahub-io/notebooks.git", &[]);
    let step = b.copy(Some(&base), &git, "/README.md", "/");

    let project = TestProject::new();
    project.definition("def.pb", &b.finish(&step));

    project
        .cmd()
        .args(["--definition", "def.pb"])
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains(
            "Unsupported source kind: git://github.com/opendatahub-io/notebooks.git",
        ));
}

#[test]
fn test_malformed_graph_fails() {
    let project = TestProject::new();
    project.write("garbage.pb", "\u{7f}not a protobuf");

    project
        .cmd()
        .args(["--definition", "garbage.pb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed build graph"));
}

#[test]
fn test_no_partial_output_after_failure() {
    let project = TestProject::new();
    project.definition("good.pb", &sample_definition());

    project
        .cmd()
        .args(["--definition", "good.pb", "missing.pb"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("missing.pb"));
}

#[test]
fn test_verbose_logs_stay_off_stdout() {
    let project = TestProject::new();
    project.definition("def.pb", &sample_definition());

    project
        .cmd()
        .args(["--verbose", "--definition", "def.pb"])
        .assert()
        .success()
        .stdout("[\"codeserver/ubi9-python-3.12/test\",\"foo\"]\n")
        .stderr(predicate::str::contains("COPY codeserver/ubi9-python-3.12/test"));
}

#[test]
fn test_build_args_are_rejected() {
    let project = TestProject::new();
    project.definition("def.pb", &sample_definition());

    project
        .cmd()
        .args(["--definition", "--build-arg", "NOEQUALS", "def.pb"])
        .assert()
        .failure()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("cannot be used with"));
}
