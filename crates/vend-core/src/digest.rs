//! # Content Digests
//!
//! SHA-256 fingerprints computed by the storage writer at store time. The
//! digest gives the catalog a verifiable content reference during the window
//! between the initial store and the pin step, after which the pinning
//! service's content identifier becomes the published reference.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

/// Errors from parsing a hex digest.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DigestError {
    /// Input is not exactly 64 lowercase hex characters.
    #[error("digest {0:?} is not a 64-character hex string")]
    InvalidHex(String),
}

impl ContentDigest {
    /// Compute the digest of a byte slice.
    pub fn of(data: &[u8]) -> ContentDigest {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let out = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&out);
        ContentDigest { bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<ContentDigest, DigestError> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidHex(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&s[2 * i..2 * i + 2], 16)
                .map_err(|_| DigestError::InvalidHex(s.to_string()))?;
        }
        Ok(ContentDigest { bytes })
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_input() {
        // Well-known SHA-256 of the empty string.
        assert_eq!(
            ContentDigest::of(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_of_known_input() {
        assert_eq!(
            ContentDigest::of(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hex_round_trip() {
        let d = ContentDigest::of(b"round trip");
        let parsed = ContentDigest::from_hex(&d.to_hex()).unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(ContentDigest::from_hex("abcd").is_err());
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let bad = "g".repeat(64);
        assert!(ContentDigest::from_hex(&bad).is_err());
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(ContentDigest::of(b"a"), ContentDigest::of(b"b"));
    }
}
