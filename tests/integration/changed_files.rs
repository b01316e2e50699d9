//! Rebuild decisions with `--changed-files`.

use buildinputs::test_utils::sample_definition;

use crate::common::TestProject;

fn project() -> TestProject {
    let project = TestProject::new();
    project.definition("def.pb", &sample_definition());
    project
}

#[test]
fn test_changed_dependency_triggers_rebuild() {
    let project = project();
    project.write("changed.txt", "README.md\ncodeserver/ubi9-python-3.12/test/test_startup.sh\n");

    project
        .cmd()
        .args(["--definition", "--changed-files", "changed.txt", "def.pb"])
        .assert()
        .success()
        .stdout(
            "{\"path\":\"def.pb\",\"rebuild\":true,\
             \"reason\":\"codeserver/ubi9-python-3.12/test/test_startup.sh\"}\n",
        );
}

#[test]
fn test_unrelated_changes_skip_rebuild() {
    let project = project();
    project.write("changed.txt", "README.md\ncodeserver/ubi9-python-3.11/test/a.sh\nfoobar\n");

    project
        .cmd()
        .args(["--definition", "--changed-files", "changed.txt", "def.pb"])
        .assert()
        .success()
        .stdout("{\"path\":\"def.pb\",\"rebuild\":false,\"reason\":null}\n");
}

#[test]
fn test_changed_files_from_stdin() {
    let project = project();

    project
        .cmd()
        .args(["--definition", "--changed-files", "-", "def.pb"])
        .write_stdin("docs/index.md\nfoo/bar.txt\n")
        .assert()
        .success()
        .stdout("{\"path\":\"def.pb\",\"rebuild\":true,\"reason\":\"foo/bar.txt\"}\n");
}

#[test]
fn test_missing_changed_files_list_fails() {
    project()
        .cmd()
        .args(["--definition", "--changed-files", "nope.txt", "def.pb"])
        .assert()
        .failure()
        .stdout("");
}
