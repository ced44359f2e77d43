//! Transaction construction via the builder pattern.
//!
//! A [`TransactionBuilder`] holds the signer and the header fields shared by
//! every signed variant. Each terminal method takes the variant's payload,
//! signs, and returns a ready [`Transaction`].
//!
//! ```
//! use namechain_protocol::account::Address;
//! use namechain_protocol::crypto::Keypair;
//! use namechain_protocol::transaction::{Amount, TransactionBuilder};
//!
//! let keypair = Keypair::from_passphrase("alice");
//! let bob = Address::from_public_key(&Keypair::from_passphrase("bob").public_key());
//! let tx = TransactionBuilder::new(&keypair)
//!     .fee(Amount::from_coins(1))
//!     .payment(bob, Amount::from_coins(10));
//! assert!(tx.is_signature_valid());
//! ```

use super::common::{sign, TransactionHeader};
use super::{
    Amount, ArbitraryDataTransaction, BuyNameTransaction, CancelOrderTransaction,
    CancelSellNameTransaction, CreateOrderTransaction, CreatePollTransaction,
    IssueAssetTransaction, PaymentTransaction, RegisterNameTransaction, SellNameTransaction,
    Transaction, TransferAssetTransaction, UpdateNameTransaction, VoteOnPollTransaction,
};
use crate::account::Address;
use crate::clock::{Clock, SystemClock};
use crate::crypto::{Keypair, Signature};
use crate::naming::{Name, NameSale};
use crate::storage::{DatabaseSet, DbResult};
use crate::voting::Poll;

/// Fee used when none is set.
pub const DEFAULT_FEE: Amount = Amount::from_coins(1);

/// Fluent builder for signed transactions.
///
/// Defaults: fee [`DEFAULT_FEE`], timestamp from the system clock at the
/// time the terminal method runs, reference all zeros (which no ledger
/// accepts, so set it with [`reference`](Self::reference) or
/// [`reference_from`](Self::reference_from)).
#[derive(Debug, Clone)]
pub struct TransactionBuilder<'a> {
    keypair: &'a Keypair,
    fee: Amount,
    timestamp: Option<i64>,
    reference: Signature,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(keypair: &'a Keypair) -> Self {
        Self {
            keypair,
            fee: DEFAULT_FEE,
            timestamp: None,
            reference: Signature::zero(),
        }
    }

    pub fn fee(mut self, fee: Amount) -> Self {
        self.fee = fee;
        self
    }

    /// Sets the timestamp explicitly (Unix milliseconds).
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Takes the timestamp from `clock` now.
    pub fn timestamp_from(self, clock: &dyn Clock) -> Self {
        self.timestamp(clock.now_millis())
    }

    pub fn reference(mut self, reference: Signature) -> Self {
        self.reference = reference;
        self
    }

    /// Uses the signer's current last reference in `db`.
    pub fn reference_from(mut self, db: &DatabaseSet) -> DbResult<Self> {
        let creator = Address::from_public_key(&self.keypair.public_key());
        if let Some(reference) = db.reference(&creator)? {
            self.reference = reference;
        }
        Ok(self)
    }

    fn header(&self) -> TransactionHeader {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| SystemClock.now_millis());
        TransactionHeader::new(
            self.keypair.public_key(),
            timestamp,
            self.reference.clone(),
            self.fee,
        )
    }

    // -- Terminal methods -----------------------------------------------------

    pub fn payment(self, recipient: Address, amount: Amount) -> Transaction {
        let tx = PaymentTransaction::new(self.header(), recipient, amount);
        sign(tx, self.keypair).into()
    }

    pub fn register_name(self, name: Name) -> Transaction {
        sign(RegisterNameTransaction::new(self.header(), name), self.keypair).into()
    }

    pub fn update_name(self, name: Name) -> Transaction {
        sign(UpdateNameTransaction::new(self.header(), name), self.keypair).into()
    }

    pub fn sell_name(self, sale: NameSale) -> Transaction {
        sign(SellNameTransaction::new(self.header(), sale), self.keypair).into()
    }

    pub fn cancel_sell_name(self, name: impl Into<String>) -> Transaction {
        sign(CancelSellNameTransaction::new(self.header(), name), self.keypair).into()
    }

    /// Buy a listed name. `seller` is the owner the buyer expects to pay.
    pub fn buy_name(self, sale: NameSale, seller: Address) -> Transaction {
        sign(BuyNameTransaction::new(self.header(), sale, seller), self.keypair).into()
    }

    pub fn create_poll(self, poll: Poll) -> Transaction {
        sign(CreatePollTransaction::new(self.header(), poll), self.keypair).into()
    }

    pub fn vote_on_poll(self, poll: impl Into<String>, option: u32) -> Transaction {
        sign(VoteOnPollTransaction::new(self.header(), poll, option), self.keypair).into()
    }

    pub fn arbitrary_data(self, service: u32, data: Vec<u8>) -> Transaction {
        sign(ArbitraryDataTransaction::new(self.header(), service, data), self.keypair).into()
    }

    pub fn issue_asset(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        quantity: Amount,
        divisible: bool,
    ) -> Transaction {
        let tx = IssueAssetTransaction::new(self.header(), name, description, quantity, divisible);
        sign(tx, self.keypair).into()
    }

    pub fn transfer_asset(self, recipient: Address, asset: u64, amount: Amount) -> Transaction {
        let tx = TransferAssetTransaction::new(self.header(), recipient, asset, amount);
        sign(tx, self.keypair).into()
    }

    /// Offer `amount` of `have` at `price` units of `want` per unit.
    pub fn create_order(self, have: u64, want: u64, amount: Amount, price: Amount) -> Transaction {
        let tx = CreateOrderTransaction::new(self.header(), have, want, amount, price);
        sign(tx, self.keypair).into()
    }

    pub fn cancel_order(self, order: Signature) -> Transaction {
        sign(CancelOrderTransaction::new(self.header(), order), self.keypair).into()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
