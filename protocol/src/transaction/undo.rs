//! Undo records.
//!
//! `process` captures everything `orphan` cannot recompute from the
//! transaction itself and stores it in the ledger's undo tree, keyed by the
//! transaction signature. Balances need no record: amounts are in the
//! transaction. References and overwritten entities do.

use serde::{Deserialize, Serialize};

use crate::account::Address;
use crate::assets::Order;
use crate::crypto::Signature;
use crate::naming::{Name, NameSale};

/// What a processed transaction needs to be orphaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    /// Prior last-reference of every account whose reference was written,
    /// in write order. Orphan restores them in reverse.
    pub references: Vec<(Address, Option<Signature>)>,
    pub detail: UndoDetail,
}

/// Variant-specific pre-images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoDetail {
    None,
    /// The name as it was before an UpdateName overwrote it.
    PriorName(Name),
    /// The listing a CancelSellName removed.
    CancelledSale(NameSale),
    /// The option the voter had chosen before a VoteOnPoll, if any.
    PreviousVote(Option<u32>),
    /// Key allocated by an IssueAsset.
    AssetKey(u64),
    /// The open order a CancelOrder removed.
    CancelledOrder(Order),
}

/// Collects prior references while a transaction is processed.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    references: Vec<(Address, Option<Signature>)>,
}

impl Journal {
    pub(crate) fn record_reference(&mut self, address: Address, prior: Option<Signature>) {
        self.references.push((address, prior));
    }

    pub(crate) fn finish(self, detail: UndoDetail) -> UndoRecord {
        UndoRecord {
            references: self.references,
            detail,
        }
    }
}
