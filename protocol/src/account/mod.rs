//! # Accounts
//!
//! An account is nothing more than an [`Address`]: its balances and its last
//! reference live in the ledger, and [`Account`] is a typed view over them.
//! [`PrivateKeyAccount`] pairs the view with the keypair that controls it.

pub mod address;

pub use address::{Address, AddressError};

use crate::config::NATIVE_ASSET_KEY;
use crate::crypto::{Keypair, PublicKey, Signature};
use crate::storage::{DatabaseSet, DbResult};
use crate::transaction::Amount;

/// A view of one address's ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Account {
    address: Address,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self::new(Address::from_public_key(public_key))
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Confirmed balance of `asset`. Absent records read as zero.
    pub fn confirmed_balance(&self, db: &DatabaseSet, asset: u64) -> DbResult<Amount> {
        db.balance(&self.address, asset)
    }

    /// Confirmed balance of the native coin.
    pub fn native_balance(&self, db: &DatabaseSet) -> DbResult<Amount> {
        self.confirmed_balance(db, NATIVE_ASSET_KEY)
    }

    pub fn set_confirmed_balance(
        &self,
        db: &mut DatabaseSet,
        amount: Amount,
        asset: u64,
    ) -> DbResult<()> {
        db.set_balance(&self.address, asset, amount)
    }

    /// Signature of the last transaction that touched this account, if any.
    pub fn last_reference(&self, db: &DatabaseSet) -> DbResult<Option<Signature>> {
        db.reference(&self.address)
    }

    pub fn set_last_reference(
        &self,
        db: &mut DatabaseSet,
        reference: Option<Signature>,
    ) -> DbResult<()> {
        db.set_reference(&self.address, reference.as_ref())
    }
}

impl From<Address> for Account {
    fn from(address: Address) -> Self {
        Self::new(address)
    }
}

/// An account together with its signing key.
#[derive(Debug, Clone)]
pub struct PrivateKeyAccount {
    keypair: Keypair,
    account: Account,
}

impl PrivateKeyAccount {
    pub fn new(keypair: Keypair) -> Self {
        let account = Account::from_public_key(&keypair.public_key());
        Self { keypair, account }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(Keypair::from_seed(seed))
    }

    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::new(Keypair::from_passphrase(passphrase))
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn address(&self) -> &Address {
        self.account.address()
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}

impl std::ops::Deref for PrivateKeyAccount {
    type Target = Account;

    fn deref(&self) -> &Account {
        &self.account
    }
}
