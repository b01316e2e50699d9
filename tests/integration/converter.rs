//! End-to-end runs through an external converter.
//!
//! The converter is a shell script that records its arguments and prints a
//! prepared definition, standing in for a real Dockerfile converter.

#![cfg(unix)]

use buildinputs::constants::STUB_IMAGE_DIGEST;
use buildinputs::test_utils::sample_definition;
use predicates::prelude::*;
use std::fs;

use crate::common::TestProject;

const EXPECTED: &str = "[\"codeserver/ubi9-python-3.12/test\",\"foo\"]\n";

/// Project with a Dockerfile, a fake converter and a config pointing at it.
fn project(extra_config: &str) -> TestProject {
    let project = TestProject::new();
    project.write(
        "codeserver/ubi9-python-3.12/Dockerfile.cpu",
        "ARG BASE_IMAGE\nFROM ${BASE_IMAGE}\nCOPY ${CODESERVER_SOURCE_CODE}/test /tmp/test\n",
    );
    let definition = project.definition("converted.pb", &sample_definition());
    let args_file = project.path().join("args.txt");
    let converter = project.converter(
        "bin/fake-converter",
        &format!(
            "#!/bin/sh\necho \"$@\" > '{}'\necho 'WARN: JSONArgsRecommended' >&2\ncat '{}'\n",
            args_file.display(),
            definition.display()
        ),
    );
    project.write(
        "buildinputs.toml",
        &format!("[frontend]\nprogram = '{}'\n{extra_config}", converter.display()),
    );
    project
}

fn recorded_args(project: &TestProject) -> String {
    fs::read_to_string(project.path().join("args.txt")).unwrap()
}

#[test]
fn test_end_to_end() {
    let project = project("");

    project
        .cmd()
        .env("TARGETPLATFORM", "linux/amd64")
        .args([
            "--build-arg",
            "BASE_IMAGE=fake-image",
            "codeserver/ubi9-python-3.12/Dockerfile.cpu",
        ])
        .assert()
        .success()
        .stdout(EXPECTED)
        .stderr(predicate::str::contains("JSONArgsRecommended"));

    let args = recorded_args(&project);
    assert!(args.contains("--platform linux/amd64"), "{args}");
    assert!(args.contains("--image-config "), "{args}");
    assert!(args.contains(&format!("--image-digest {STUB_IMAGE_DIGEST} ")), "{args}");
    assert!(args.contains("--build-arg BASE_IMAGE=fake-image"), "{args}");
    assert!(args.trim_end().ends_with("codeserver/ubi9-python-3.12/Dockerfile.cpu"), "{args}");
}

#[test]
fn test_config_supplies_build_args_and_converter_args() {
    let project = project("args = ['--target', 'cpu']\n\n[build_args]\nBASE_IMAGE = 'from-config'\n");

    project
        .cmd()
        .env("TARGETPLATFORM", "linux/arm64")
        .arg("codeserver/ubi9-python-3.12/Dockerfile.cpu")
        .assert()
        .success()
        .stdout(EXPECTED);

    let args = recorded_args(&project);
    assert!(args.starts_with("--target cpu --platform linux/arm64"), "{args}");
    assert!(args.contains("--build-arg BASE_IMAGE=from-config"), "{args}");
}

#[test]
fn test_command_line_build_arg_overrides_config() {
    let project = project("\n[build_args]\nBASE_IMAGE = 'from-config'\n");

    project
        .cmd()
        .env("TARGETPLATFORM", "linux/amd64")
        .args([
            "--build-arg",
            "BASE_IMAGE=from-cli",
            "codeserver/ubi9-python-3.12/Dockerfile.cpu",
        ])
        .assert()
        .success();

    let args = recorded_args(&project);
    assert!(args.contains("BASE_IMAGE=from-cli"), "{args}");
    assert!(!args.contains("from-config"), "{args}");
}

#[test]
fn test_converter_failure() {
    let project = TestProject::new();
    project.write("Dockerfile", "FORM scratch\n");
    let converter = project.converter(
        "fail.sh",
        "#!/bin/sh\necho 'dockerfile parse error: unknown instruction: FORM' >&2\nexit 1\n",
    );
    project.write("buildinputs.toml", &format!("[frontend]\nprogram = '{}'\n", converter.display()));

    project
        .cmd()
        .env("TARGETPLATFORM", "linux/amd64")
        .args(["--build-arg", "BASE_IMAGE=fake-image", "Dockerfile"])
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Build graph conversion failed for Dockerfile"))
        .stderr(predicate::str::contains("unknown instruction: FORM"));
}
