//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};

use namechain_protocol::account::Address;
use namechain_protocol::crypto::Keypair;
use namechain_protocol::storage::DatabaseSet;
use namechain_protocol::transaction::{
    Amount, GenesisTransaction, Transaction, TransactionBuilder, ValidationResult,
};

pub const GENESIS_TIMESTAMP: i64 = 1_400_000_000_000;

static NEXT_TIMESTAMP: AtomicI64 = AtomicI64::new(1_500_000_000_000);

pub fn keypair(seed: &str) -> Keypair {
    Keypair::from_passphrase(seed)
}

pub fn address(keypair: &Keypair) -> Address {
    Address::from_public_key(&keypair.public_key())
}

pub fn coins(n: i64) -> Amount {
    Amount::from_coins(n)
}

/// An empty ledger where each account received `coins` at genesis.
pub fn ledger_with(allocations: &[(&Keypair, i64)]) -> DatabaseSet {
    let mut db = DatabaseSet::create_empty().expect("temporary ledger");
    for (keypair, amount) in allocations {
        let genesis = GenesisTransaction::new(address(keypair), coins(*amount), GENESIS_TIMESTAMP);
        genesis.process(&mut db).expect("genesis");
    }
    db
}

/// A builder for `keypair` pointing at its current reference, with a
/// unique timestamp.
pub fn signer<'a>(db: &DatabaseSet, keypair: &'a Keypair) -> TransactionBuilder<'a> {
    TransactionBuilder::new(keypair)
        .timestamp(NEXT_TIMESTAMP.fetch_add(1, Ordering::SeqCst))
        .reference_from(db)
        .expect("reference lookup")
}

/// Validate and process, panicking on anything but `Ok`.
pub fn apply(db: &mut DatabaseSet, tx: &Transaction) {
    assert!(tx.is_signature_valid(), "bad signature on {:?}", tx.transaction_type());
    assert_eq!(tx.is_valid(db).unwrap(), ValidationResult::Ok);
    tx.process(db).unwrap();
}

pub fn balance(db: &DatabaseSet, keypair: &Keypair) -> Amount {
    db.balance(&address(keypair), 0).unwrap()
}
