//! Preconditions checked before any converter runs.

use predicates::prelude::*;

use crate::common::TestProject;

fn project_with_dockerfile() -> TestProject {
    let project = TestProject::new();
    project.write("Dockerfile", "ARG BASE_IMAGE\nFROM ${BASE_IMAGE}\nCOPY foo /bar\n");
    project
}

#[test]
fn test_missing_target_platform() {
    let project = project_with_dockerfile();

    project
        .cmd()
        .args(["--build-arg", "BASE_IMAGE=fake-image", "Dockerfile"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("TARGETPLATFORM environment variable is required"));
}

#[test]
fn test_malformed_target_platform() {
    let project = project_with_dockerfile();

    project
        .cmd()
        .env("TARGETPLATFORM", "linux")
        .args(["--build-arg", "BASE_IMAGE=fake-image", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Target platform format is invalid"));
}

#[test]
fn test_non_linux_target_platform() {
    let project = project_with_dockerfile();

    project
        .cmd()
        .env("TARGETPLATFORM", "darwin/arm64")
        .args(["--build-arg", "BASE_IMAGE=fake-image", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Operating system 'darwin' is not supported"));
}

#[test]
fn test_platform_flag_is_accepted() {
    let project = project_with_dockerfile();

    // Gets past the platform check and stops at the next one
    project
        .cmd()
        .args(["--platform", "linux/amd64", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BASE_IMAGE build argument is required"));
}

#[test]
fn test_missing_base_image() {
    let project = project_with_dockerfile();

    project
        .cmd()
        .env("TARGETPLATFORM", "linux/amd64")
        .args(["--build-arg", "PYTHON=3.12", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BASE_IMAGE build argument is required"));
}

#[test]
fn test_invalid_build_arg() {
    let project = project_with_dockerfile();

    project
        .cmd()
        .env("TARGETPLATFORM", "linux/amd64")
        .args(["--build-arg", "BASE_IMAGE", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid build argument"));
}

#[test]
fn test_converter_not_found() {
    let project = project_with_dockerfile();
    project.write("buildinputs.toml", "[frontend]\nprogram = \"buildinputs-missing-converter\"\n");

    project
        .cmd()
        .env("TARGETPLATFORM", "linux/amd64")
        .args(["--build-arg", "BASE_IMAGE=fake-image", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'buildinputs-missing-converter' not found"))
        .stderr(predicate::str::contains("--definition"));
}

#[test]
fn test_explicit_config_must_exist() {
    let project = project_with_dockerfile();

    project
        .cmd()
        .args(["--config", "nope.toml", "--definition", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_invalid_config() {
    let project = project_with_dockerfile();
    project.write("ci.toml", "[frontend\n");

    project
        .cmd()
        .env("BUILDINPUTS_CONFIG", "ci.toml")
        .args(["--definition", "Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_paths_are_required() {
    TestProject::new().cmd().assert().failure().stderr(predicate::str::contains("PATHS"));
}
