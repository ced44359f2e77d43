//! Block-order application and rollback.
//!
//! [`apply_block`] is the only sanctioned way to push transactions into a
//! persistent ledger: signatures are checked in parallel up front, then each
//! transaction is validated and processed in order on a fork. Any failure
//! drops the fork, leaving the ledger untouched. [`orphan_block`] undoes the
//! newest block the same way, in reverse.

use thiserror::Error;
use tracing::{info, warn};

use super::block::BlockRecord;
use super::db::{DatabaseSet, DbError};
use crate::crypto::batch_verify;
use crate::transaction::{LedgerError, ParseError, Transaction, ValidationResult};

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("transaction {index} ({signature}) has an invalid signature")]
    InvalidSignature { index: usize, signature: String },

    #[error("transaction {index} ({signature}) rejected: {result}")]
    Invalid {
        index: usize,
        signature: String,
        result: ValidationResult,
    },

    #[error("transaction {index} ({signature}) is already on the ledger")]
    Duplicate { index: usize, signature: String },

    #[error("no blocks to orphan")]
    EmptyChain,

    #[error("stored transaction {0} missing")]
    MissingTransaction(String),

    #[error("stored transaction unreadable: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Index of the first transaction whose signature does not verify.
fn first_bad_signature(transactions: &[Transaction]) -> Option<usize> {
    let mut indices = Vec::with_capacity(transactions.len());
    let mut items = Vec::with_capacity(transactions.len());
    for (index, tx) in transactions.iter().enumerate() {
        match tx.verify_item() {
            Some(item) => {
                indices.push(index);
                items.push(item);
            }
            None if !tx.is_signature_valid() => return Some(index),
            None => {}
        }
    }
    batch_verify(&items)
        .into_iter()
        .zip(indices)
        .find(|(valid, _)| !valid)
        .map(|(_, index)| index)
}

/// Apply `transactions` as the next block and record it.
pub fn apply_block(
    db: &mut DatabaseSet,
    transactions: &[Transaction],
    timestamp: i64,
) -> Result<BlockRecord, BlockError> {
    if let Some(index) = first_bad_signature(transactions) {
        let signature = transactions[index].signature().short();
        warn!(index, %signature, "block rejected: bad signature");
        return Err(BlockError::InvalidSignature { index, signature });
    }

    let parent = db.last_block()?;
    let mut fork = db.fork();
    for (index, tx) in transactions.iter().enumerate() {
        // Undo records and raw bytes are keyed by signature.
        if fork.undo_record(tx.signature())?.is_some()
            || fork.raw_transaction(tx.signature())?.is_some()
        {
            let signature = tx.signature().short();
            warn!(index, %signature, "block rejected: duplicate transaction");
            return Err(BlockError::Duplicate { index, signature });
        }
        let result = tx.is_valid(&fork)?;
        if !result.is_ok() {
            let signature = tx.signature().short();
            warn!(index, %signature, %result, "block rejected");
            return Err(BlockError::Invalid {
                index,
                signature,
                result,
            });
        }
        tx.process(&mut fork)?;
        fork.put_raw_transaction(tx.signature(), tx.to_bytes())?;
    }

    let signatures = transactions.iter().map(|tx| tx.signature().clone()).collect();
    let block = BlockRecord::new(parent.as_ref(), timestamp, signatures);
    fork.put_block(&block)?;
    fork.commit()?;
    db.commit()?;

    info!(
        height = block.height,
        transactions = block.tx_count(),
        signature = %block.signature_hex(),
        "block applied"
    );
    Ok(block)
}

/// The transactions of `block`, decoded from the ledger.
pub fn block_transactions(
    db: &DatabaseSet,
    block: &BlockRecord,
) -> Result<Vec<Transaction>, BlockError> {
    block
        .transactions
        .iter()
        .map(|signature| {
            let bytes = db
                .raw_transaction(signature)?
                .ok_or_else(|| BlockError::MissingTransaction(signature.short()))?;
            Ok(Transaction::parse(&bytes)?)
        })
        .collect()
}

/// Undo the newest block and remove it from the index.
pub fn orphan_block(db: &mut DatabaseSet) -> Result<BlockRecord, BlockError> {
    let block = db.last_block()?.ok_or(BlockError::EmptyChain)?;
    let transactions = block_transactions(db, &block)?;

    let mut fork = db.fork();
    for tx in transactions.iter().rev() {
        tx.orphan(&mut fork)?;
        fork.delete_raw_transaction(tx.signature())?;
    }
    fork.delete_block(&block)?;
    fork.commit()?;
    db.commit()?;

    info!(height = block.height, transactions = block.tx_count(), "block orphaned");
    Ok(block)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Address;
    use crate::crypto::{Keypair, Signature};
    use crate::naming::Name;
    use crate::transaction::{Amount, GenesisTransaction, TransactionBuilder};

    fn address(keypair: &Keypair) -> Address {
        Address::from_public_key(&keypair.public_key())
    }

    fn genesis(keypair: &Keypair) -> Transaction {
        GenesisTransaction::new(address(keypair), Amount::from_coins(1000), 0).into()
    }

    #[test]
    fn blocks_apply_and_orphan_in_order() {
        let mut db = DatabaseSet::create_empty().unwrap();
        let empty = db.state_root().unwrap();
        let alice = Keypair::from_passphrase("alice");

        let first = apply_block(&mut db, &[genesis(&alice)], 1).unwrap();
        assert_eq!(first.height, 0);
        let after_first = db.state_root().unwrap();

        let register = TransactionBuilder::new(&alice)
            .timestamp(2)
            .reference_from(&db)
            .unwrap()
            .register_name(Name::new(address(&alice), "test", "value"));
        let second = apply_block(&mut db, &[register], 2).unwrap();
        assert_eq!(second.parent, first.signature);
        assert_eq!(db.chain_height().unwrap(), Some(1));
        assert!(db.contains_name("test").unwrap());
        assert_eq!(
            db.block_by_signature(&second.signature).unwrap(),
            Some(second.clone())
        );

        assert_eq!(orphan_block(&mut db).unwrap(), second);
        assert_eq!(db.state_root().unwrap(), after_first);

        assert_eq!(orphan_block(&mut db).unwrap(), first);
        assert_eq!(db.state_root().unwrap(), empty);
        assert!(matches!(orphan_block(&mut db), Err(BlockError::EmptyChain)));
    }

    #[test]
    fn invalid_transaction_rejects_whole_block() {
        let mut db = DatabaseSet::create_empty().unwrap();
        let alice = Keypair::from_passphrase("alice");
        apply_block(&mut db, &[genesis(&alice)], 1).unwrap();
        let before = db.state_root().unwrap();

        let builder = TransactionBuilder::new(&alice).timestamp(2).reference_from(&db).unwrap();
        let good = builder
            .clone()
            .register_name(Name::new(address(&alice), "good", "value"));
        // Same reference as `good`, so it is stale once `good` is processed.
        let stale = builder.register_name(Name::new(address(&alice), "stale", "value"));

        match apply_block(&mut db, &[good, stale], 2) {
            Err(BlockError::Invalid { index, result, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(result, ValidationResult::InvalidReference);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(db.state_root().unwrap(), before);
        assert!(!db.contains_name("good").unwrap());
    }

    #[test]
    fn bad_signature_rejected_before_validation() {
        let mut db = DatabaseSet::create_empty().unwrap();
        let alice = Keypair::from_passphrase("alice");
        let Transaction::Genesis(mut forged) = genesis(&alice) else {
            unreachable!()
        };
        forged.amount = Amount::from_coins(1_000_000);
        let valid = genesis(&Keypair::from_passphrase("bob"));

        match apply_block(&mut db, &[valid, forged.into()], 1) {
            Err(BlockError::InvalidSignature { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected signature failure, got {other:?}"),
        }

        let tx = TransactionBuilder::new(&alice)
            .timestamp(3)
            .payment(address(&alice), Amount::from_coins(1));
        let Transaction::Payment(mut tampered) = tx else {
            unreachable!()
        };
        tampered.header.signature = Signature::zero();
        assert!(matches!(
            apply_block(&mut db, &[tampered.into()], 1),
            Err(BlockError::InvalidSignature { index: 0, .. })
        ));
        assert_eq!(db.chain_height().unwrap(), None);
    }

    #[test]
    fn duplicate_transactions_are_rejected() {
        let mut db = DatabaseSet::create_empty().unwrap();
        let alice = Keypair::from_passphrase("alice");

        match apply_block(&mut db, &[genesis(&alice), genesis(&alice)], 1) {
            Err(BlockError::Duplicate { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected duplicate rejection, got {other:?}"),
        }
        assert_eq!(db.chain_height().unwrap(), None);
        assert_eq!(db.balance(&address(&alice), 0).unwrap(), Amount::ZERO);

        apply_block(&mut db, &[genesis(&alice)], 1).unwrap();
        let applied = db.state_root().unwrap();
        assert!(matches!(
            apply_block(&mut db, &[genesis(&alice)], 2),
            Err(BlockError::Duplicate { index: 0, .. })
        ));
        assert_eq!(db.state_root().unwrap(), applied);

        orphan_block(&mut db).unwrap();
        assert_eq!(db.balance(&address(&alice), 0).unwrap(), Amount::ZERO);
        // Once orphaned, the same allocation may be applied again.
        apply_block(&mut db, &[genesis(&alice)], 3).unwrap();
        assert_eq!(db.balance(&address(&alice), 0).unwrap(), Amount::from_coins(1000));
    }

    #[test]
    fn stored_transactions_decode() {
        let mut db = DatabaseSet::create_empty().unwrap();
        let alice = Keypair::from_passphrase("alice");
        let block = apply_block(&mut db, &[genesis(&alice)], 1).unwrap();
        assert_eq!(block_transactions(&db, &block).unwrap(), vec![genesis(&alice)]);
    }
}
