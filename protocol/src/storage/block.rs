//! # Block Records
//!
//! The ledger applies transactions in blocks and keeps one [`BlockRecord`]
//! per applied block, so that blocks can be orphaned again in reverse
//! order.
//!
//! ## Layout
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  BlockRecord                                  │
//! │  ├── height: u64          (0 for the first)   │
//! │  ├── signature: [u8; 32]  (BLAKE3, see below) │
//! │  ├── parent: [u8; 32]     (zeros for height 0)│
//! │  ├── timestamp: i64                           │
//! │  └── transactions: Vec<Signature>             │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The block signature is `BLAKE3(height ‖ parent ‖ timestamp ‖ tx_root)`,
//! where `tx_root` is the Merkle root over the BLAKE3 hashes of the
//! transaction signatures in block order. Empty blocks have a zero root.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{blake3_hash, blake3_hash_multi};
use crate::crypto::{merkle_root, Signature};

/// One applied block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub height: u64,
    pub signature: [u8; 32],
    pub parent: [u8; 32],
    /// Unix milliseconds.
    pub timestamp: i64,
    /// Signatures of the block's transactions, in application order.
    pub transactions: Vec<Signature>,
}

impl BlockRecord {
    /// A record following `parent`, or the first block when `parent` is
    /// `None`.
    pub fn new(parent: Option<&BlockRecord>, timestamp: i64, transactions: Vec<Signature>) -> Self {
        let (height, parent) = match parent {
            Some(p) => (p.height + 1, p.signature),
            None => (0, [0u8; 32]),
        };
        let signature = compute_signature(height, &parent, timestamp, &transactions);
        Self {
            height,
            signature,
            parent,
            timestamp,
            transactions,
        }
    }

    /// Whether the stored signature matches the contents.
    pub fn verify(&self) -> bool {
        self.signature
            == compute_signature(self.height, &self.parent, self.timestamp, &self.transactions)
    }

    pub fn signature_hex(&self) -> String {
        hex::encode(self.signature)
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

/// Merkle root over the BLAKE3 hashes of `transactions`.
pub fn transactions_root(transactions: &[Signature]) -> [u8; 32] {
    let leaves: Vec<[u8; 32]> = transactions
        .iter()
        .map(|signature| blake3_hash(signature.as_bytes()))
        .collect();
    merkle_root(&leaves)
}

fn compute_signature(
    height: u64,
    parent: &[u8; 32],
    timestamp: i64,
    transactions: &[Signature],
) -> [u8; 32] {
    let tx_root = transactions_root(transactions);
    blake3_hash_multi(&[
        &height.to_be_bytes()[..],
        &parent[..],
        &timestamp.to_be_bytes()[..],
        &tx_root[..],
    ])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
