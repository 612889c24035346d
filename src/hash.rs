//! Content addressing for blobs and commits.
//!
//! Every structure element's identity is `BlobKey::new(serialized_bytes)`:
//! the SHA-256 digest of its canonical serialization. Two callers who
//! independently produce identical content therefore compute the same key
//! (deduplication is free, per the invariant in the data model).

use std::fmt::Display;
use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha2::Digest;

pub const KEY_BYTES: usize = 32;

#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct BlobKey([u8; KEY_BYTES]);

impl BlobKey {
    /// Hash raw bytes into a key. Used by the codec once it has produced a
    /// structure element's canonical serialization.
    pub fn new(data: &[u8]) -> Self {
        let digest = sha2::Sha256::digest(data);
        let mut bytes = [0u8; KEY_BYTES];
        bytes.copy_from_slice(digest.as_slice());
        BlobKey(bytes)
    }

    pub fn zero() -> Self {
        BlobKey([0u8; KEY_BYTES])
    }

    pub fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlobKey({})", self.to_hex())
    }
}

impl Display for BlobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for BlobKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for BlobKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = hex::decode(s).map_err(|e| e.to_string())?;
        if decoded.len() != KEY_BYTES {
            return Err(format!(
                "invalid key length: got {}, expected {}",
                decoded.len(),
                KEY_BYTES
            ));
        }
        let mut bytes = [0u8; KEY_BYTES];
        bytes.copy_from_slice(&decoded);
        Ok(BlobKey(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic() {
        let a = BlobKey::new(b"hello ocean");
        let b = BlobKey::new(b"hello ocean");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_content_distinct_key() {
        let a = BlobKey::new(b"hello ocean");
        let b = BlobKey::new(b"hello ocean!");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_round_trip() {
        let key = BlobKey::new(b"round trip me");
        let s = key.to_hex();
        let parsed: BlobKey = s.parse().unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn from_str_rejects_wrong_length() {
        assert!("deadbeef".parse::<BlobKey>().is_err());
    }
}
