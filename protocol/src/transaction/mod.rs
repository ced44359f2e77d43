//! # Transaction Module
//!
//! The closed set of ledger transactions and the contract they share. Each
//! variant knows its wire layout, its validation rules and the exact forward
//! and reverse ledger mutation it performs.
//!
//! ## Architecture
//!
//! ```text
//! types.rs                 TransactionType, Amount, ValidationResult
//! common.rs                shared header, process/orphan frame, validation helpers
//! codec.rs                 big-endian wire primitives
//! factory.rs               bytes → Transaction
//! builder.rs               fluent construction and signing
//! undo.rs                  pre-images captured by process for orphan
//! genesis.rs, payment.rs, names.rs, polls.rs, arbitrary.rs,
//! asset_ops.rs, orders.rs  the variants
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build** or **parse**: [`TransactionBuilder`] or [`Transaction::parse`].
//! 2. **Verify**: [`Transaction::is_signature_valid`].
//! 3. **Validate**: [`Transaction::is_valid`] against a ledger, read-only.
//! 4. **Process**: [`Transaction::process`] mutates the ledger and stores an
//!    undo record under the transaction signature.
//! 5. **Orphan**: [`Transaction::orphan`] consumes that record and restores
//!    the prior state exactly.
//!
//! Callers serialize steps 3 and 4 per ledger. Step 2 is pure and can run in
//! parallel across many transactions (see [`crate::crypto::batch_verify`]).

pub mod arbitrary;
pub mod asset_ops;
pub mod builder;
pub(crate) mod codec;
mod common;
pub mod factory;
pub mod genesis;
pub mod names;
pub mod orders;
pub mod payment;
pub mod polls;
pub mod types;
pub mod undo;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::common::SignedTransaction;
use crate::account::Address;
use crate::crypto::{Keypair, PublicKey, Signature, VerifyItem};
use crate::storage::{DatabaseSet, DbError, DbResult};

pub use arbitrary::ArbitraryDataTransaction;
pub use asset_ops::{IssueAssetTransaction, TransferAssetTransaction};
pub use builder::TransactionBuilder;
pub use common::TransactionHeader;
pub use genesis::{GenesisTransaction, GENESIS_LENGTH};
pub use names::{
    BuyNameTransaction, CancelSellNameTransaction, RegisterNameTransaction, SellNameTransaction,
    UpdateNameTransaction,
};
pub use orders::{CancelOrderTransaction, CreateOrderTransaction};
pub use payment::PaymentTransaction;
pub use polls::{CreatePollTransaction, VoteOnPollTransaction};
pub use types::{Amount, AmountParseError, TransactionType, ValidationResult};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Bytes that do not decode to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown transaction type {0}")]
    UnknownType(u32),

    #[error("truncated {field}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("malformed {0}")]
    Malformed(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

/// Failure while mutating the ledger.
///
/// Everything except `Db` means the caller applied or orphaned transactions
/// out of order. The ledger must not be used further without rolling the
/// enclosing fork back.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("no undo record for transaction {0}")]
    MissingUndoRecord(String),

    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),

    #[error("amount overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Any ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transaction {
    Genesis(GenesisTransaction),
    Payment(PaymentTransaction),
    RegisterName(RegisterNameTransaction),
    UpdateName(UpdateNameTransaction),
    SellName(SellNameTransaction),
    CancelSellName(CancelSellNameTransaction),
    BuyName(BuyNameTransaction),
    CreatePoll(CreatePollTransaction),
    VoteOnPoll(VoteOnPollTransaction),
    ArbitraryData(ArbitraryDataTransaction),
    IssueAsset(IssueAssetTransaction),
    TransferAsset(TransferAssetTransaction),
    CreateOrder(CreateOrderTransaction),
    CancelOrder(CancelOrderTransaction),
}

/// Match on a transaction, binding signed variants to `$tx` and genesis to
/// `$genesis`.
macro_rules! dispatch {
    ($value:expr, $genesis:ident => $on_genesis:expr, $tx:ident => $on_signed:expr) => {
        match $value {
            Transaction::Genesis($genesis) => $on_genesis,
            Transaction::Payment($tx) => $on_signed,
            Transaction::RegisterName($tx) => $on_signed,
            Transaction::UpdateName($tx) => $on_signed,
            Transaction::SellName($tx) => $on_signed,
            Transaction::CancelSellName($tx) => $on_signed,
            Transaction::BuyName($tx) => $on_signed,
            Transaction::CreatePoll($tx) => $on_signed,
            Transaction::VoteOnPoll($tx) => $on_signed,
            Transaction::ArbitraryData($tx) => $on_signed,
            Transaction::IssueAsset($tx) => $on_signed,
            Transaction::TransferAsset($tx) => $on_signed,
            Transaction::CreateOrder($tx) => $on_signed,
            Transaction::CancelOrder($tx) => $on_signed,
        }
    };
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Transaction {
                fn from(tx: $ty) -> Self {
                    Transaction::$variant(tx)
                }
            }
        )*
    };
}

impl_from_variant!(
    Genesis(GenesisTransaction),
    Payment(PaymentTransaction),
    RegisterName(RegisterNameTransaction),
    UpdateName(UpdateNameTransaction),
    SellName(SellNameTransaction),
    CancelSellName(CancelSellNameTransaction),
    BuyName(BuyNameTransaction),
    CreatePoll(CreatePollTransaction),
    VoteOnPoll(VoteOnPollTransaction),
    ArbitraryData(ArbitraryDataTransaction),
    IssueAsset(IssueAssetTransaction),
    TransferAsset(TransferAssetTransaction),
    CreateOrder(CreateOrderTransaction),
    CancelOrder(CancelOrderTransaction),
);

impl Transaction {
    /// Decode a transaction. Inverse of [`to_bytes`](Self::to_bytes).
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        factory::parse(bytes)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        dispatch!(self, g => g.to_bytes(), tx => common::to_bytes(tx))
    }

    /// Exact length of [`to_bytes`](Self::to_bytes).
    pub fn data_length(&self) -> usize {
        dispatch!(self, _g => GENESIS_LENGTH, tx => common::data_length(tx))
    }

    pub fn transaction_type(&self) -> TransactionType {
        fn kind<T: SignedTransaction>(_: &T) -> TransactionType {
            T::TYPE
        }
        dispatch!(self, _g => TransactionType::Genesis, tx => kind(tx))
    }

    pub fn signature(&self) -> &Signature {
        dispatch!(self, g => &g.signature, tx => &tx.header.signature)
    }

    pub fn timestamp(&self) -> i64 {
        dispatch!(self, g => g.timestamp, tx => tx.header.timestamp)
    }

    /// `None` for genesis.
    pub fn creator(&self) -> Option<&PublicKey> {
        dispatch!(self, _g => None, tx => Some(&tx.header.creator))
    }

    /// `None` for genesis.
    pub fn reference(&self) -> Option<&Signature> {
        dispatch!(self, _g => None, tx => Some(&tx.header.reference))
    }

    pub fn fee(&self) -> Amount {
        dispatch!(self, _g => Amount::ZERO, tx => tx.header.fee)
    }

    /// Replace the signature with the creator's signature over the current
    /// contents. Genesis transactions are self-signed and returned as-is.
    pub fn sign(self, keypair: &Keypair) -> Self {
        match self {
            Transaction::Genesis(g) => Transaction::Genesis(g),
            Transaction::Payment(tx) => common::sign(tx, keypair).into(),
            Transaction::RegisterName(tx) => common::sign(tx, keypair).into(),
            Transaction::UpdateName(tx) => common::sign(tx, keypair).into(),
            Transaction::SellName(tx) => common::sign(tx, keypair).into(),
            Transaction::CancelSellName(tx) => common::sign(tx, keypair).into(),
            Transaction::BuyName(tx) => common::sign(tx, keypair).into(),
            Transaction::CreatePoll(tx) => common::sign(tx, keypair).into(),
            Transaction::VoteOnPoll(tx) => common::sign(tx, keypair).into(),
            Transaction::ArbitraryData(tx) => common::sign(tx, keypair).into(),
            Transaction::IssueAsset(tx) => common::sign(tx, keypair).into(),
            Transaction::TransferAsset(tx) => common::sign(tx, keypair).into(),
            Transaction::CreateOrder(tx) => common::sign(tx, keypair).into(),
            Transaction::CancelOrder(tx) => common::sign(tx, keypair).into(),
        }
    }

    /// Whether the signature verifies over the encoding minus its trailing
    /// signature. Never panics on garbage keys or signatures.
    pub fn is_signature_valid(&self) -> bool {
        dispatch!(self, g => g.is_signature_valid(), tx => common::is_signature_valid(tx))
    }

    /// Input for [`crate::crypto::batch_verify`]. `None` for genesis, whose
    /// signature is a digest rather than a key signature.
    pub fn verify_item(&self) -> Option<VerifyItem> {
        dispatch!(self, _g => None, tx => Some(VerifyItem {
            public_key: tx.header.creator,
            message: common::signing_bytes(tx),
            signature: tx.header.signature.clone(),
        }))
    }

    /// First failing business rule, or [`ValidationResult::Ok`]. Read-only.
    pub fn is_valid(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        dispatch!(self, g => g.is_valid(db), tx => tx.validate(db))
    }

    /// Signature check followed by [`is_valid`](Self::is_valid).
    pub fn check(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !self.is_signature_valid() {
            return Ok(ValidationResult::InvalidSignature);
        }
        self.is_valid(db)
    }

    /// Apply to `db`. The caller has validated the transaction against the
    /// same state.
    pub fn process(&self, db: &mut DatabaseSet) -> Result<(), LedgerError> {
        dispatch!(self, g => g.process(db), tx => common::process(tx, db))
    }

    /// Undo a previous [`process`](Self::process). `db` must be in the state
    /// `process` left it in, as far as this transaction's entities go.
    pub fn orphan(&self, db: &mut DatabaseSet) -> Result<(), LedgerError> {
        dispatch!(self, g => g.orphan(db), tx => common::orphan(tx, db))
    }

    /// Net native coin this transaction moves for `address`, fee included.
    pub fn amount(&self, address: &Address) -> Amount {
        dispatch!(self, g => g.amount(address), tx => common::amount(tx, address))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
