//! Body checksums.
//!
//! MD5 is used only to catch accidental corruption in transit. It carries no
//! integrity guarantee against a peer that wants to lie.

use md5::{Digest as _, Md5};

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 16;

/// A finished body digest.
pub type Digest = [u8; DIGEST_LEN];

/// Running digest fed incrementally as body bytes stream past.
#[derive(Clone, Default)]
pub struct Checksum {
    hasher: Md5,
}

impl Checksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finalize(self) -> Digest {
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&self.hasher.finalize());
        digest
    }
}

/// Computes the digest of an in-memory buffer.
pub fn digest(data: &[u8]) -> Digest {
    let mut checksum = Checksum::new();
    checksum.update(data);
    checksum.finalize()
}

/// Returns true iff both digests are byte-for-byte equal, length included.
pub fn verify(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Lowercase hex rendering for logs.
pub fn to_hex(digest: &[u8]) -> String {
    hex::encode(digest)
}
