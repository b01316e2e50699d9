//! Shared helpers for buildinputs integration tests

// Not every helper is used by every test module
#![allow(dead_code)]

use assert_cmd::Command;
use buildinputs::llb::Definition;
use buildinputs::test_utils::write_definition;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory the binary runs in, with an isolated environment.
pub struct TestProject {
    temp: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write a serialized definition into the project.
    pub fn definition(&self, name: &str, definition: &Definition) -> PathBuf {
        write_definition(self.path(), name, definition).unwrap()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// `buildinputs` in the project directory, without any inherited
    /// TARGETPLATFORM, BUILDINPUTS_CONFIG or RUST_LOG.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("buildinputs").unwrap();
        cmd.current_dir(self.path())
            .env_remove("TARGETPLATFORM")
            .env_remove("BUILDINPUTS_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Install an executable shell script acting as the converter.
    #[cfg(unix)]
    pub fn converter(&self, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(name, script);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
