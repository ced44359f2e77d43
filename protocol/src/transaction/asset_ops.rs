//! Issuing and transferring user assets.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::codec::{put_amount, put_string, string_length, Reader};
use super::common::{
    asset_exists, check_common, credit, debit, fits_divisibility, init_reference_if_absent,
    HeaderPrefix, SignedTransaction, TransactionHeader,
};
use super::names::name_length_ok;
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::account::Address;
use crate::assets::Asset;
use crate::config::{
    ADDRESS_LENGTH, AMOUNT_LENGTH, ASSET_KEY_LENGTH, MAX_DESCRIPTION_LENGTH, NATIVE_ASSET_KEY,
};
use crate::storage::{DatabaseSet, DbResult};

// ---------------------------------------------------------------------------
// IssueAsset
// ---------------------------------------------------------------------------

/// Wire payload: `name str | description str | quantity i64 | divisible u8`.
///
/// The issuer owns the asset and receives the whole quantity. The key is
/// assigned at processing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueAssetTransaction {
    pub header: TransactionHeader,
    pub name: String,
    pub description: String,
    pub quantity: Amount,
    pub divisible: bool,
}

impl IssueAssetTransaction {
    pub fn new(
        header: TransactionHeader,
        name: impl Into<String>,
        description: impl Into<String>,
        quantity: Amount,
        divisible: bool,
    ) -> Self {
        Self {
            header,
            name: name.into(),
            description: description.into(),
            quantity,
            divisible,
        }
    }
}

impl SignedTransaction for IssueAssetTransaction {
    const TYPE: TransactionType = TransactionType::IssueAsset;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        string_length(&self.name) + string_length(&self.description) + AMOUNT_LENGTH + 1
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.name);
        put_string(buf, &self.description);
        put_amount(buf, self.quantity);
        buf.put_u8(u8::from(self.divisible));
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let name = reader.string("name")?;
        let description = reader.string("description")?;
        let quantity = reader.amount("quantity")?;
        let divisible = match reader.u8("divisible")? {
            0 => false,
            1 => true,
            _ => return Err(ParseError::Malformed("divisible")),
        };
        Ok(Self::new(
            prefix.finish(reader)?,
            name,
            description,
            quantity,
            divisible,
        ))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !name_length_ok(&self.name) {
            return Ok(ValidationResult::InvalidNameLength);
        }
        if !(1..=MAX_DESCRIPTION_LENGTH).contains(&self.description.len()) {
            return Ok(ValidationResult::InvalidDescriptionLength);
        }
        if !self.quantity.is_positive() || (!self.divisible && !self.quantity.is_whole()) {
            return Ok(ValidationResult::InvalidQuantity);
        }
        check_common(&self.header, db, Amount::ZERO)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let owner = self.header.creator_address();
        let key = db.next_asset_key()?;
        let next = key.checked_add(1).ok_or(LedgerError::Overflow)?;
        db.put_asset(&Asset {
            key,
            owner,
            name: self.name.clone(),
            description: self.description.clone(),
            quantity: self.quantity,
            divisible: self.divisible,
            reference: self.header.signature.clone(),
        })?;
        db.set_next_asset_key(next)?;
        credit(db, &owner, key, self.quantity)?;
        Ok(UndoDetail::AssetKey(key))
    }

    fn revert(&self, db: &mut DatabaseSet, detail: UndoDetail) -> Result<(), LedgerError> {
        let UndoDetail::AssetKey(key) = detail else {
            return Err(LedgerError::InvariantViolation(
                "issue asset undo record holds no asset key".into(),
            ));
        };
        debit(db, &self.header.creator_address(), key, self.quantity)?;
        db.delete_asset(key)?;
        db.set_next_asset_key(key)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TransferAsset
// ---------------------------------------------------------------------------

/// Wire payload: `recipient [25] | asset u64 | amount i64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAssetTransaction {
    pub header: TransactionHeader,
    pub recipient: Address,
    pub asset: u64,
    pub amount: Amount,
}

impl TransferAssetTransaction {
    pub fn new(header: TransactionHeader, recipient: Address, asset: u64, amount: Amount) -> Self {
        Self {
            header,
            recipient,
            asset,
            amount,
        }
    }
}

impl SignedTransaction for TransferAssetTransaction {
    const TYPE: TransactionType = TransactionType::TransferAsset;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        ADDRESS_LENGTH + ASSET_KEY_LENGTH + AMOUNT_LENGTH
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.put_slice(self.recipient.as_bytes());
        buf.put_u64(self.asset);
        put_amount(buf, self.amount);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let recipient = reader.address("recipient")?;
        let asset = reader.u64("asset")?;
        let amount = reader.amount("amount")?;
        Ok(Self::new(prefix.finish(reader)?, recipient, asset, amount))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !self.recipient.is_valid() {
            return Ok(ValidationResult::InvalidAddress);
        }
        if !self.amount.is_positive() {
            return Ok(ValidationResult::NegativeAmount);
        }
        if !asset_exists(db, self.asset)? {
            return Ok(ValidationResult::AssetDoesNotExist);
        }
        if !fits_divisibility(db, self.asset, self.amount)? {
            return Ok(ValidationResult::InvalidAmount);
        }
        if self.asset == NATIVE_ASSET_KEY {
            return check_common(&self.header, db, self.amount);
        }
        if db.balance(&self.header.creator_address(), self.asset)? < self.amount {
            return Ok(ValidationResult::NoBalance);
        }
        check_common(&self.header, db, Amount::ZERO)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let sender = self.header.creator_address();
        debit(db, &sender, self.asset, self.amount)?;
        credit(db, &self.recipient, self.asset, self.amount)?;
        init_reference_if_absent(db, journal, self.recipient, &self.header.signature)?;
        Ok(UndoDetail::None)
    }

    fn revert(&self, db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        let sender = self.header.creator_address();
        debit(db, &self.recipient, self.asset, self.amount)?;
        credit(db, &sender, self.asset, self.amount)?;
        Ok(())
    }

    fn native_delta(&self, address: &Address) -> Amount {
        if self.asset != NATIVE_ASSET_KEY {
            return Amount::ZERO;
        }
        let mut delta = 0i64;
        if address == &self.header.creator_address() {
            delta -= self.amount.units();
        }
        if address == &self.recipient {
            delta += self.amount.units();
        }
        Amount::from_units(delta)
    }
}
