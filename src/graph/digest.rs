//! Content digests identifying build graph nodes.

use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::constants::DIGEST_ALGORITHM;
use crate::core::{BuildInputsError, Result};

/// Identity of a build graph node: `sha256:<hex>` over its serialized bytes.
///
/// Two records with identical bytes always get the same digest, which is
/// what lets the loader collapse structurally identical nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Compute the digest of a raw serialized record.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(format!("{DIGEST_ALGORITHM}:{}", hex::encode(hasher.finalize())))
    }

    /// Parse a digest reference found inside a record.
    ///
    /// # Errors
    ///
    /// Returns [`BuildInputsError::MalformedGraph`] unless the value is
    /// `sha256:` followed by 64 lowercase hex characters.
    pub fn parse(value: &str) -> Result<Self> {
        let hex_part = value
            .strip_prefix(DIGEST_ALGORITHM)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| {
                BuildInputsError::malformed(format!("unsupported digest reference {value:?}"))
            })?;

        let well_formed = hex_part.len() == 64
            && hex_part.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(BuildInputsError::malformed(format!("invalid digest reference {value:?}")));
        }

        Ok(Self(value.to_string()))
    }

    /// The full `sha256:<hex>` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        let start = DIGEST_ALGORITHM.len() + 1;
        &self.0[start..start + 12]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_of_empty_input() {
        let digest = Digest::from_bytes(b"");
        assert_eq!(
            digest.as_str(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest.short(), "e3b0c44298fc");
    }

    #[test]
    fn test_identical_bytes_identical_digest() {
        assert_eq!(Digest::from_bytes(b"op"), Digest::from_bytes(b"op"));
        assert_ne!(Digest::from_bytes(b"op"), Digest::from_bytes(b"op2"));
    }

    #[test]
    fn test_parse_roundtrips_computed_digest() {
        let digest = Digest::from_bytes(b"record");
        assert_eq!(Digest::parse(digest.as_str()).unwrap(), digest);
    }

    #[test]
    fn test_parse_rejects_malformed_references() {
        for bad in ["", "sha256:", "md5:abcd", "sha256:XYZ", "sha256:e3b0c44298fc"] {
            let err = Digest::parse(bad).unwrap_err();
            assert!(matches!(err, BuildInputsError::MalformedGraph { .. }), "{bad}");
        }
    }
}
