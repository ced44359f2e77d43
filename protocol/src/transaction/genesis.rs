//! Genesis: seed an account with coin out of nothing.
//!
//! Genesis transactions have no creator, reference or fee. Their signature
//! is the SHA-512 digest of their own encoded fields, so anyone can check it
//! and nobody needs a key to produce one.

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::codec::{put_amount, Reader};
use super::common::{credit, debit, restore_references, set_reference};
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::account::Address;
use crate::config::{
    ADDRESS_LENGTH, AMOUNT_LENGTH, NATIVE_ASSET_KEY, SIGNATURE_LENGTH, TIMESTAMP_LENGTH,
    TYPE_LENGTH,
};
use crate::crypto::{sha512, Signature};
use crate::storage::{DatabaseSet, DbResult};

/// Total encoded length: `type | timestamp | recipient | amount | signature`.
pub const GENESIS_LENGTH: usize =
    TYPE_LENGTH + TIMESTAMP_LENGTH + ADDRESS_LENGTH + AMOUNT_LENGTH + SIGNATURE_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisTransaction {
    pub timestamp: i64,
    pub recipient: Address,
    pub amount: Amount,
    pub signature: Signature,
}

impl GenesisTransaction {
    pub fn new(recipient: Address, amount: Amount, timestamp: i64) -> Self {
        let mut tx = Self {
            timestamp,
            recipient,
            amount,
            signature: Signature::zero(),
        };
        tx.signature = Signature::from_bytes(sha512(&tx.signed_fields()));
        tx
    }

    fn signed_fields(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(GENESIS_LENGTH - SIGNATURE_LENGTH);
        buf.put_u32(TransactionType::Genesis.as_u32());
        buf.put_i64(self.timestamp);
        buf.put_slice(self.recipient.as_bytes());
        put_amount(&mut buf, self.amount);
        buf
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.signed_fields();
        buf.put_slice(self.signature.as_bytes());
        buf
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            timestamp: reader.i64("timestamp")?,
            recipient: reader.address("recipient")?,
            amount: reader.amount("amount")?,
            signature: reader.signature("signature")?,
        })
    }

    pub fn is_signature_valid(&self) -> bool {
        self.signature.as_bytes() == sha512(&self.signed_fields()).as_slice()
    }

    pub fn is_valid(&self, _db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !self.recipient.is_valid() {
            return Ok(ValidationResult::InvalidAddress);
        }
        if self.amount.is_negative() {
            return Ok(ValidationResult::NegativeAmount);
        }
        Ok(ValidationResult::Ok)
    }

    pub fn process(&self, db: &mut DatabaseSet) -> Result<(), LedgerError> {
        let mut journal = Journal::default();
        credit(db, &self.recipient, NATIVE_ASSET_KEY, self.amount)?;
        set_reference(db, &mut journal, self.recipient, &self.signature)?;
        db.put_undo_record(&self.signature, &journal.finish(UndoDetail::None))?;
        debug!(recipient = %self.recipient, amount = %self.amount, "genesis processed");
        Ok(())
    }

    pub fn orphan(&self, db: &mut DatabaseSet) -> Result<(), LedgerError> {
        let record = db
            .undo_record(&self.signature)?
            .ok_or_else(|| LedgerError::MissingUndoRecord(self.signature.short()))?;
        if db.reference(&self.recipient)?.as_ref() != Some(&self.signature) {
            warn!(recipient = %self.recipient, "genesis orphan out of order");
            return Err(LedgerError::InvariantViolation(format!(
                "last reference of {} is not genesis {}",
                self.recipient,
                self.signature.short()
            )));
        }
        debit(db, &self.recipient, NATIVE_ASSET_KEY, self.amount)?;
        restore_references(db, record.references)?;
        db.delete_undo_record(&self.signature)?;
        debug!(recipient = %self.recipient, "genesis orphaned");
        Ok(())
    }

    pub fn amount(&self, address: &Address) -> Amount {
        if address == &self.recipient {
            self.amount
        } else {
            Amount::ZERO
        }
    }
}
