//! Name registry and marketplace transactions.
//!
//! Validation runs field checks, then existence, then ownership, then the
//! common balance/reference/fee checks, and listing state last.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::codec::{put_amount, put_string, string_length, Reader};
use super::common::{
    check_common, credit, debit, init_reference_if_absent, HeaderPrefix, SignedTransaction,
    TransactionHeader,
};
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::account::Address;
use crate::config::{
    ADDRESS_LENGTH, AMOUNT_LENGTH, MAX_NAME_LENGTH, MAX_VALUE_LENGTH, NATIVE_ASSET_KEY,
};
use crate::naming::{is_lower_case, Name, NameSale};
use crate::storage::{DatabaseSet, DbResult};

pub(crate) fn name_length_ok(name: &str) -> bool {
    (1..=MAX_NAME_LENGTH).contains(&name.len())
}

fn value_length_ok(value: &str) -> bool {
    (1..=MAX_VALUE_LENGTH).contains(&value.len())
}

fn write_name(buf: &mut Vec<u8>, name: &Name) {
    buf.put_slice(name.owner.as_bytes());
    put_string(buf, &name.name);
    put_string(buf, &name.value);
}

fn read_name(reader: &mut Reader<'_>) -> Result<Name, ParseError> {
    let owner = reader.address("owner")?;
    let name = reader.string("name")?;
    let value = reader.string("value")?;
    Ok(Name::new(owner, name, value))
}

fn name_length(name: &Name) -> usize {
    ADDRESS_LENGTH + string_length(&name.name) + string_length(&name.value)
}

/// Shared prefix of the rules for transactions acting on an existing name
/// the signer must own.
fn check_owned(
    header: &TransactionHeader,
    db: &DatabaseSet,
    name: &str,
) -> DbResult<ValidationResult> {
    if !name_length_ok(name) {
        return Ok(ValidationResult::InvalidNameLength);
    }
    let Some(current) = db.name(name)? else {
        return Ok(ValidationResult::NameDoesNotExist);
    };
    if current.owner != header.creator_address() {
        return Ok(ValidationResult::InvalidNameOwner);
    }
    check_common(header, db, Amount::ZERO)
}

fn missing(what: &str, name: &str) -> LedgerError {
    LedgerError::InvariantViolation(format!("{what} {name:?} missing"))
}

// ---------------------------------------------------------------------------
// RegisterName
// ---------------------------------------------------------------------------

/// Wire payload: `owner [25] | name str | value str`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNameTransaction {
    pub header: TransactionHeader,
    pub name: Name,
}

impl RegisterNameTransaction {
    pub fn new(header: TransactionHeader, name: Name) -> Self {
        Self { header, name }
    }
}

impl SignedTransaction for RegisterNameTransaction {
    const TYPE: TransactionType = TransactionType::RegisterName;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        name_length(&self.name)
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        write_name(buf, &self.name);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let name = read_name(reader)?;
        Ok(Self::new(prefix.finish(reader)?, name))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !name_length_ok(&self.name.name) {
            return Ok(ValidationResult::InvalidNameLength);
        }
        if !value_length_ok(&self.name.value) {
            return Ok(ValidationResult::InvalidValueLength);
        }
        if !is_lower_case(&self.name.name) {
            return Ok(ValidationResult::NameNotLowerCase);
        }
        if !self.name.owner.is_valid() {
            return Ok(ValidationResult::InvalidAddress);
        }
        if db.contains_name(&self.name.name)? {
            return Ok(ValidationResult::NameAlreadyRegistered);
        }
        check_common(&self.header, db, Amount::ZERO)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        db.put_name(&self.name)?;
        Ok(UndoDetail::None)
    }

    fn revert(&self, db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        db.delete_name(&self.name.name)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UpdateName
// ---------------------------------------------------------------------------

/// Replaces owner and value of an existing name. Same payload as
/// [`RegisterNameTransaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNameTransaction {
    pub header: TransactionHeader,
    pub name: Name,
}

impl UpdateNameTransaction {
    pub fn new(header: TransactionHeader, name: Name) -> Self {
        Self { header, name }
    }
}

impl SignedTransaction for UpdateNameTransaction {
    const TYPE: TransactionType = TransactionType::UpdateName;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        name_length(&self.name)
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        write_name(buf, &self.name);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let name = read_name(reader)?;
        Ok(Self::new(prefix.finish(reader)?, name))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !name_length_ok(&self.name.name) {
            return Ok(ValidationResult::InvalidNameLength);
        }
        if !value_length_ok(&self.name.value) {
            return Ok(ValidationResult::InvalidValueLength);
        }
        if !self.name.owner.is_valid() {
            return Ok(ValidationResult::InvalidAddress);
        }
        check_owned(&self.header, db, &self.name.name)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let prior = db
            .name(&self.name.name)?
            .ok_or_else(|| missing("name", &self.name.name))?;
        db.put_name(&self.name)?;
        Ok(UndoDetail::PriorName(prior))
    }

    fn revert(&self, db: &mut DatabaseSet, detail: UndoDetail) -> Result<(), LedgerError> {
        let UndoDetail::PriorName(prior) = detail else {
            return Err(LedgerError::InvariantViolation(
                "update name undo record holds no prior name".into(),
            ));
        };
        db.put_name(&prior)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SellName
// ---------------------------------------------------------------------------

/// Wire payload: `name str | amount i64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellNameTransaction {
    pub header: TransactionHeader,
    pub sale: NameSale,
}

impl SellNameTransaction {
    pub fn new(header: TransactionHeader, sale: NameSale) -> Self {
        Self { header, sale }
    }
}

impl SignedTransaction for SellNameTransaction {
    const TYPE: TransactionType = TransactionType::SellName;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        string_length(&self.sale.name) + AMOUNT_LENGTH
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.sale.name);
        put_amount(buf, self.sale.amount);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let name = reader.string("name")?;
        let amount = reader.amount("amount")?;
        Ok(Self::new(prefix.finish(reader)?, NameSale::new(name, amount)))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !name_length_ok(&self.sale.name) {
            return Ok(ValidationResult::InvalidNameLength);
        }
        if !self.sale.amount.is_positive() {
            return Ok(ValidationResult::NegativeAmount);
        }
        let result = check_owned(&self.header, db, &self.sale.name)?;
        if !result.is_ok() {
            return Ok(result);
        }
        if db.contains_name_sale(&self.sale.name)? {
            return Ok(ValidationResult::NameAlreadyForSale);
        }
        Ok(ValidationResult::Ok)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        db.put_name_sale(&self.sale)?;
        Ok(UndoDetail::None)
    }

    fn revert(&self, db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        db.delete_name_sale(&self.sale.name)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CancelSellName
// ---------------------------------------------------------------------------

/// Wire payload: `name str`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSellNameTransaction {
    pub header: TransactionHeader,
    pub name: String,
}

impl CancelSellNameTransaction {
    pub fn new(header: TransactionHeader, name: impl Into<String>) -> Self {
        Self {
            header,
            name: name.into(),
        }
    }
}

impl SignedTransaction for CancelSellNameTransaction {
    const TYPE: TransactionType = TransactionType::CancelSellName;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        string_length(&self.name)
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.name);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let name = reader.string("name")?;
        Ok(Self::new(prefix.finish(reader)?, name))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        let result = check_owned(&self.header, db, &self.name)?;
        if !result.is_ok() {
            return Ok(result);
        }
        if !db.contains_name_sale(&self.name)? {
            return Ok(ValidationResult::NameNotForSale);
        }
        Ok(ValidationResult::Ok)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let sale = db
            .name_sale(&self.name)?
            .ok_or_else(|| missing("sale of", &self.name))?;
        db.delete_name_sale(&self.name)?;
        Ok(UndoDetail::CancelledSale(sale))
    }

    fn revert(&self, db: &mut DatabaseSet, detail: UndoDetail) -> Result<(), LedgerError> {
        let UndoDetail::CancelledSale(sale) = detail else {
            return Err(LedgerError::InvariantViolation(
                "cancel sale undo record holds no listing".into(),
            ));
        };
        db.put_name_sale(&sale)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BuyName
// ---------------------------------------------------------------------------

/// Wire payload: `name str | amount i64 | seller [25]`.
///
/// `seller` is the owner the buyer expects; a purchase racing an ownership
/// change fails with `INVALID_SELLER` rather than paying the wrong account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyNameTransaction {
    pub header: TransactionHeader,
    pub sale: NameSale,
    pub seller: Address,
}

impl BuyNameTransaction {
    pub fn new(header: TransactionHeader, sale: NameSale, seller: Address) -> Self {
        Self {
            header,
            sale,
            seller,
        }
    }
}

impl SignedTransaction for BuyNameTransaction {
    const TYPE: TransactionType = TransactionType::BuyName;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        string_length(&self.sale.name) + AMOUNT_LENGTH + ADDRESS_LENGTH
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.sale.name);
        put_amount(buf, self.sale.amount);
        buf.put_slice(self.seller.as_bytes());
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let name = reader.string("name")?;
        let amount = reader.amount("amount")?;
        let seller = reader.address("seller")?;
        Ok(Self::new(
            prefix.finish(reader)?,
            NameSale::new(name, amount),
            seller,
        ))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !name_length_ok(&self.sale.name) {
            return Ok(ValidationResult::InvalidNameLength);
        }
        if !self.sale.amount.is_positive() {
            return Ok(ValidationResult::NegativeAmount);
        }
        let Some(current) = db.name(&self.sale.name)? else {
            return Ok(ValidationResult::NameDoesNotExist);
        };
        if current.owner != self.seller {
            return Ok(ValidationResult::InvalidSeller);
        }
        let result = check_common(&self.header, db, self.sale.amount)?;
        if !result.is_ok() {
            return Ok(result);
        }
        let Some(listing) = db.name_sale(&self.sale.name)? else {
            return Ok(ValidationResult::NameNotForSale);
        };
        if current.owner == self.header.creator_address() {
            return Ok(ValidationResult::BuyerAlreadyOwner);
        }
        if listing.amount != self.sale.amount {
            return Ok(ValidationResult::InvalidAmount);
        }
        Ok(ValidationResult::Ok)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let buyer = self.header.creator_address();
        let mut name = db
            .name(&self.sale.name)?
            .ok_or_else(|| missing("name", &self.sale.name))?;

        debit(db, &buyer, NATIVE_ASSET_KEY, self.sale.amount)?;
        credit(db, &self.seller, NATIVE_ASSET_KEY, self.sale.amount)?;
        init_reference_if_absent(db, journal, self.seller, &self.header.signature)?;

        name.owner = buyer;
        db.put_name(&name)?;
        db.delete_name_sale(&self.sale.name)?;
        Ok(UndoDetail::None)
    }

    fn revert(&self, db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        let buyer = self.header.creator_address();
        let mut name = db
            .name(&self.sale.name)?
            .ok_or_else(|| missing("name", &self.sale.name))?;

        debit(db, &self.seller, NATIVE_ASSET_KEY, self.sale.amount)?;
        credit(db, &buyer, NATIVE_ASSET_KEY, self.sale.amount)?;

        name.owner = self.seller;
        db.put_name(&name)?;
        db.put_name_sale(&self.sale)?;
        Ok(())
    }

    fn native_delta(&self, address: &Address) -> Amount {
        let mut delta = 0i64;
        if address == &self.header.creator_address() {
            delta -= self.sale.amount.units();
        }
        if address == &self.seller {
            delta += self.sale.amount.units();
        }
        Amount::from_units(delta)
    }
}
