//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers around audited implementations:
//!
//! - **Ed25519** for account keys and transaction signatures.
//! - **SHA-256 / SHA-512** for key derivation, addresses and genesis.
//! - **BLAKE3** for block signatures and the ledger state root.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, double_sha256, merkle_root, sha256, sha512};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
pub use signatures::{batch_verify, sign, verify, VerifyItem};
