//! Payment: move native coin from the signer to a recipient.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::codec::{put_amount, Reader};
use super::common::{
    check_common, credit, debit, init_reference_if_absent, HeaderPrefix, SignedTransaction,
    TransactionHeader,
};
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::account::Address;
use crate::config::{ADDRESS_LENGTH, AMOUNT_LENGTH, NATIVE_ASSET_KEY};
use crate::storage::{DatabaseSet, DbResult};

/// Wire payload: `recipient [25] | amount i64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub header: TransactionHeader,
    pub recipient: Address,
    pub amount: Amount,
}

impl PaymentTransaction {
    pub fn new(header: TransactionHeader, recipient: Address, amount: Amount) -> Self {
        Self {
            header,
            recipient,
            amount,
        }
    }
}

impl SignedTransaction for PaymentTransaction {
    const TYPE: TransactionType = TransactionType::Payment;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        ADDRESS_LENGTH + AMOUNT_LENGTH
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.put_slice(self.recipient.as_bytes());
        put_amount(buf, self.amount);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let recipient = reader.address("recipient")?;
        let amount = reader.amount("amount")?;
        Ok(Self::new(prefix.finish(reader)?, recipient, amount))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !self.recipient.is_valid() {
            return Ok(ValidationResult::InvalidAddress);
        }
        if !self.amount.is_positive() {
            return Ok(ValidationResult::NegativeAmount);
        }
        check_common(&self.header, db, self.amount)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let sender = self.header.creator_address();
        debit(db, &sender, NATIVE_ASSET_KEY, self.amount)?;
        credit(db, &self.recipient, NATIVE_ASSET_KEY, self.amount)?;
        init_reference_if_absent(db, journal, self.recipient, &self.header.signature)?;
        Ok(UndoDetail::None)
    }

    fn revert(&self, db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        let sender = self.header.creator_address();
        debit(db, &self.recipient, NATIVE_ASSET_KEY, self.amount)?;
        credit(db, &sender, NATIVE_ASSET_KEY, self.amount)?;
        Ok(())
    }

    fn native_delta(&self, address: &Address) -> Amount {
        let sender = self.header.creator_address();
        let mut delta = 0i64;
        if address == &sender {
            delta -= self.amount.units();
        }
        if address == &self.recipient {
            delta += self.amount.units();
        }
        Amount::from_units(delta)
    }
}
