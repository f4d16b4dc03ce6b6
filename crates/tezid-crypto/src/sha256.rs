//! # SHA-256 over Raw Bytes
//!
//! The Merkle verifier hashes the plain concatenation of two byte strings,
//! with no domain-separation prefix and no reordering. These helpers are
//! the only place that concatenation happens.

use sha2::{Digest, Sha256};
use tezid_core::Hash32;

/// SHA-256 of a byte string.
pub fn sha256(data: &[u8]) -> Hash32 {
    let hash = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    Hash32::new(out)
}

/// SHA-256 of `left || right`, in exactly that order.
pub fn sha256_concat(left: &[u8], right: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash32::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Hash32 {
        Hash32::from_hex(s).unwrap()
    }

    #[test]
    fn empty_input_vector() {
        assert_eq!(
            sha256(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn concat_matches_single_buffer() {
        let a = b"left-part";
        let b = b"right-part";
        let joined = [a.as_slice(), b.as_slice()].concat();
        assert_eq!(sha256_concat(a, b), sha256(&joined));
    }

    #[test]
    fn concat_is_order_sensitive() {
        let a = h("0x7d32da12c80c7ab09e7a407277f286fd13643319bb49d95d3b9e6b6936c5a784");
        let b = h("0xa079fcef2a3e809005f55d0e10ecbe352e22d1dceeed9c70bd6b3692abb53ebe");
        assert_eq!(
            sha256_concat(a.as_ref(), b.as_ref()),
            h("0xb1d06f4340eec73c12989f3a7c59008b85541a3196b23263f64da839a4fe355a")
        );
        assert_ne!(
            sha256_concat(a.as_ref(), b.as_ref()),
            sha256_concat(b.as_ref(), a.as_ref())
        );
    }
}
