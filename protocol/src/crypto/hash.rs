//! # Hashing Utilities
//!
//! - **SHA-256** derives keys from passphrases and, doubled, builds address
//!   hashes and checksums.
//! - **SHA-512** signs genesis transactions, which have no creator key.
//! - **BLAKE3** is used for everything Namechain-internal: block signatures
//!   and the ledger state root.

use sha2::{Digest, Sha256, Sha512};

/// SHA-256 digest.
///
/// # Example
///
/// ```
/// use namechain_protocol::crypto::sha256;
///
/// assert_eq!(sha256(b"test").len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha256::digest(data));
    output
}

/// `SHA-256(SHA-256(data))`.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// SHA-512 digest. Exactly the width of a signature, which is what genesis
/// transactions use it for.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    let mut output = [0u8; 64];
    output.copy_from_slice(&Sha512::digest(data));
    output
}

/// BLAKE3 digest.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash several slices as if concatenated, without the temporary buffer.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Compute a Merkle root from a list of leaf hashes using BLAKE3.
///
/// Odd levels duplicate their last node. An empty list hashes to all zeros.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            if let Some(last) = level.last().copied() {
                level.push(last);
            }
        }
        level = level
            .chunks(2)
            .map(|pair| blake3_hash_multi(&[&pair[0], &pair[1]]))
            .collect();
    }
    level[0]
}
