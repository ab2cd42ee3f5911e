//! Streaming SHA-256 over the staged firmware image.
//!
//! The TFTP engine feeds payload bytes into this digest as each DATA block
//! arrives, so the whole image is never held in memory twice: once on disk
//! via the firmware sink, once as a running digest here.

use sha2::{Digest, Sha256};

/// Size in bytes of a finalized digest.
pub const DIGEST_SIZE: usize = 32;

/// A running SHA-256 digest over firmware bytes received so far.
#[derive(Default)]
pub struct FirmwareDigest {
    hasher: Sha256,
}

impl FirmwareDigest {
    /// Start a fresh digest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `data` into the running digest.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and return the 32-byte digest, consuming this context.
    #[must_use]
    pub fn finalize(self) -> [u8; DIGEST_SIZE] {
        self.hasher.finalize().into()
    }
}

/// Compare a computed digest against the digest the loader sent, without
/// leaking timing information about where the first mismatching byte is.
#[must_use]
pub fn digests_match(computed: &[u8; DIGEST_SIZE], received: &[u8; DIGEST_SIZE]) -> bool {
    use subtle::ConstantTimeEq;
    bool::from(computed.ct_eq(received))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_digest() {
        let digest = FirmwareDigest::new().finalize();
        let expected = Sha256::digest(b"");
        assert_eq!(&digest[..], &expected[..]);
    }

    #[test]
    fn streamed_update_matches_single_shot() {
        let mut streamed = FirmwareDigest::new();
        streamed.update(b"firm");
        streamed.update(b"ware");
        let streamed_digest = streamed.finalize();

        let single_shot: [u8; DIGEST_SIZE] = Sha256::digest(b"firmware").into();
        assert_eq!(streamed_digest, single_shot);
    }

    #[test]
    fn digests_match_detects_mismatch() {
        let a = [1u8; DIGEST_SIZE];
        let b = [2u8; DIGEST_SIZE];
        assert!(digests_match(&a, &a));
        assert!(!digests_match(&a, &b));
    }
}
