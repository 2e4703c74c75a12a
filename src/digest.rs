// Copyright 2026 The Chasm Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The 20-byte content identifier every object in the store is addressed by.

use std::fmt;

use sha1::Digest as _;
use sha1::Sha1;
use thiserror::Error;

use crate::hex_util;

/// Number of bytes in a [`Digest`]. Chasm addresses objects by SHA-1.
pub const DIGEST_LEN: usize = 20;

/// Default sharded-path prefix length (hex digits, i.e. bytes) used to split
/// a digest into `<prefix>/<remainder>`.
pub const DEFAULT_SHARD_PREFIX_LEN: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },
    #[error("invalid digest format: {0:?} is not a valid hex digest")]
    InvalidDigestFormat(String),
}

/// A fixed 20-byte content identifier. Comparable, hashable, and orderable
/// byte-exactly; the all-zero digest is the well-defined empty sentinel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// The well-defined "empty/default" sentinel: all-zero bytes.
    pub const EMPTY: Self = Self([0; DIGEST_LEN]);

    /// Constructs a digest from exactly [`DIGEST_LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DigestError> {
        if bytes.len() != DIGEST_LEN {
            return Err(DigestError::InvalidDigestLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut array = [0u8; DIGEST_LEN];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }

    /// Constructs a digest from an owned, exactly-sized byte array.
    pub fn from_array(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a hex string into a digest. Accepts a plain 40-character hex
    /// string ("n"-style) or the dashed form with `-` separators stripped
    /// before decoding ("d"-style), e.g. as produced by some external tools.
    pub fn from_hex(hex: &str) -> Result<Self, DigestError> {
        let cleaned: String = hex.chars().filter(|&c| c != '-').collect();
        let bytes = hex_util::decode_hex(&cleaned)
            .ok_or_else(|| DigestError::InvalidDigestFormat(hex.to_string()))?;
        Self::from_bytes(&bytes).map_err(|_| DigestError::InvalidDigestFormat(hex.to_string()))
    }

    /// Hashes `data` with SHA-1 and returns the resulting digest. This is the
    /// address-defining hash: the disk backend computes it while streaming a
    /// write, never after the fact.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Formats this digest as a stable 40-character lowercase hex string.
    pub fn to_hex(self) -> String {
        hex_util::encode_hex(&self.0)
    }

    /// Returns whether this is the all-zero sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Splits the digest's hex representation at `prefix_len` bytes (i.e.
    /// `2 * prefix_len` hex characters), yielding a sharded directory path
    /// component pair `(prefix, remainder)`.
    pub fn shard_split(&self, prefix_len: usize) -> (String, String) {
        let hex = self.to_hex();
        let split_at = (prefix_len * 2).min(hex.len());
        let (prefix, remainder) = hex.split_at(split_at);
        (prefix.to_string(), remainder.to_string())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Digest").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_abc_is_stable_sha1() {
        let digest = Digest::hash(b"abc");
        assert_eq!(digest.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn empty_is_all_zero_sentinel() {
        assert!(Digest::EMPTY.is_empty());
        assert_eq!(Digest::default(), Digest::EMPTY);
        assert_eq!(Digest::EMPTY.to_hex(), "0".repeat(40));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = Digest::from_bytes(&[0; 19]).unwrap_err();
        assert_eq!(
            err,
            DigestError::InvalidDigestLength {
                expected: 20,
                actual: 19
            }
        );
    }

    #[test]
    fn hex_round_trip() {
        let digest = Digest::hash(b"round trip me");
        let hex = digest.to_hex();
        assert_eq!(Digest::from_hex(&hex).unwrap(), digest);
    }

    #[test]
    fn from_hex_accepts_dashed_form() {
        let digest = Digest::hash(b"dashed");
        let hex = digest.to_hex();
        let dashed = format!("{}-{}-{}", &hex[0..8], &hex[8..16], &hex[16..]);
        assert_eq!(Digest::from_hex(&dashed).unwrap(), digest);
    }

    #[test]
    fn from_hex_rejects_malformed_input() {
        assert!(matches!(
            Digest::from_hex("not-hex-at-all-zz"),
            Err(DigestError::InvalidDigestFormat(_))
        ));
    }

    #[test]
    fn ordering_is_lexicographic_over_bytes() {
        let a = Digest::from_array([0; 20]);
        let mut b_bytes = [0; 20];
        b_bytes[19] = 1;
        let b = Digest::from_array(b_bytes);
        assert!(a < b);
    }

    #[test]
    fn shard_split_default_prefix() {
        let digest = Digest::hash(b"abc");
        let (prefix, remainder) = digest.shard_split(2);
        assert_eq!(prefix, "a999");
        assert_eq!(remainder, "3e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(format!("{prefix}{remainder}"), digest.to_hex());
    }
}
