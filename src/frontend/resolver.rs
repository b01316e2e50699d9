//! Fake parent-image metadata.
//!
//! Converting `FROM <image>` needs the parent's image config (working
//! directory, environment, user). Fetching it would mean network I/O for
//! every Dockerfile, so every image resolves to the same synthetic config.

use serde::Serialize;

use super::Platform;
use crate::constants::{STUB_IMAGE_DIGEST, STUB_IMAGE_WORKDIR};

/// What a resolver reports for an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub reference: String,
    pub digest: String,
    /// Serialized OCI image config
    pub config: Vec<u8>,
}

#[derive(Serialize)]
struct ImageConfig<'a> {
    config: ContainerConfig<'a>,
    architecture: &'a str,
    os: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerConfig<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    env: Vec<String>,
    #[serde(skip_serializing_if = "str::is_empty")]
    working_dir: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    user: &'a str,
}

/// Resolves every image to a fixed digest with `/` as working directory.
#[derive(Debug, Clone)]
pub struct StubImageResolver {
    digest: String,
    working_dir: String,
    platform: Platform,
}

impl StubImageResolver {
    pub fn new(platform: Platform) -> Self {
        Self {
            digest: STUB_IMAGE_DIGEST.to_string(),
            working_dir: STUB_IMAGE_WORKDIR.to_string(),
            platform,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The image config JSON handed to the converter.
    pub fn image_config(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&ImageConfig {
            config: ContainerConfig {
                env: Vec::new(),
                working_dir: &self.working_dir,
                user: "",
            },
            architecture: &self.platform.architecture,
            os: &self.platform.os,
        })
    }

    /// Resolve `reference` without touching any registry.
    pub fn resolve(&self, reference: &str) -> serde_json::Result<ResolvedImage> {
        Ok(ResolvedImage {
            reference: reference.to_string(),
            digest: self.digest.clone(),
            config: self.image_config()?,
        })
    }
}
