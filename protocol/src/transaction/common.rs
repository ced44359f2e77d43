//! Machinery shared by every signed transaction variant: the common header,
//! the per-variant contract, and the fee/reference/balance bookkeeping that
//! `process` and `orphan` perform around each variant's own effects.

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::codec::{put_amount, Reader};
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::account::Address;
use crate::config::{FeePolicy, BASE_LENGTH, NATIVE_ASSET_KEY, SIGNATURE_LENGTH};
use crate::crypto::{Keypair, PublicKey, Signature};
use crate::storage::{DatabaseSet, DbResult};

// ---------------------------------------------------------------------------
// TransactionHeader
// ---------------------------------------------------------------------------

/// Fields every signed transaction carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Signer's last reference at signing time.
    pub reference: Signature,
    pub creator: PublicKey,
    pub fee: Amount,
    pub signature: Signature,
}

impl TransactionHeader {
    /// An unsigned header. The signature is zero until the transaction is
    /// signed.
    pub fn new(creator: PublicKey, timestamp: i64, reference: Signature, fee: Amount) -> Self {
        Self {
            timestamp,
            reference,
            creator,
            fee,
            signature: Signature::zero(),
        }
    }

    pub fn creator_address(&self) -> Address {
        Address::from_public_key(&self.creator)
    }
}

/// Header fields that precede the payload on the wire.
pub(crate) struct HeaderPrefix {
    timestamp: i64,
    reference: Signature,
    creator: PublicKey,
}

impl HeaderPrefix {
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            timestamp: reader.i64("timestamp")?,
            reference: reader.signature("reference")?,
            creator: reader.public_key("creator")?,
        })
    }

    /// Read the fields that follow the payload.
    pub(crate) fn finish(self, reader: &mut Reader<'_>) -> Result<TransactionHeader, ParseError> {
        Ok(TransactionHeader {
            timestamp: self.timestamp,
            reference: self.reference,
            creator: self.creator,
            fee: reader.amount("fee")?,
            signature: reader.signature("signature")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Variant contract
// ---------------------------------------------------------------------------

/// What each signed variant supplies. Everything else (encoding frame,
/// signature checks, fee, references, undo bookkeeping) is generic.
pub(crate) trait SignedTransaction: Sized {
    const TYPE: TransactionType;

    fn header(&self) -> &TransactionHeader;

    fn header_mut(&mut self) -> &mut TransactionHeader;

    fn payload_length(&self) -> usize;

    fn write_payload(&self, buf: &mut Vec<u8>);

    /// Read a complete transaction after its type discriminant.
    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError>;

    /// Business rules, in priority order.
    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult>;

    /// Variant effects beyond the fee and the creator's reference.
    fn apply(&self, db: &mut DatabaseSet, journal: &mut Journal) -> Result<UndoDetail, LedgerError>;

    /// Inverse of [`apply`](Self::apply).
    fn revert(&self, db: &mut DatabaseSet, detail: UndoDetail) -> Result<(), LedgerError>;

    /// Native coin moved for `address` by the payload, excluding the fee.
    fn native_delta(&self, _address: &Address) -> Amount {
        Amount::ZERO
    }
}

pub(crate) fn data_length<T: SignedTransaction>(tx: &T) -> usize {
    BASE_LENGTH + tx.payload_length()
}

pub(crate) fn to_bytes<T: SignedTransaction>(tx: &T) -> Vec<u8> {
    let header = tx.header();
    let mut buf = Vec::with_capacity(data_length(tx));
    buf.put_u32(T::TYPE.as_u32());
    buf.put_i64(header.timestamp);
    buf.put_slice(header.reference.as_bytes());
    buf.put_slice(header.creator.as_bytes());
    tx.write_payload(&mut buf);
    put_amount(&mut buf, header.fee);
    buf.put_slice(header.signature.as_bytes());
    buf
}

/// The bytes covered by the signature: the encoding without its trailing
/// signature field.
pub(crate) fn signing_bytes<T: SignedTransaction>(tx: &T) -> Vec<u8> {
    let mut bytes = to_bytes(tx);
    bytes.truncate(bytes.len().saturating_sub(SIGNATURE_LENGTH));
    bytes
}

pub(crate) fn sign<T: SignedTransaction>(mut tx: T, keypair: &Keypair) -> T {
    let signature = keypair.sign(&signing_bytes(&tx));
    tx.header_mut().signature = signature;
    tx
}

pub(crate) fn is_signature_valid<T: SignedTransaction>(tx: &T) -> bool {
    let header = tx.header();
    header.creator.verify(&signing_bytes(tx), &header.signature)
}

/// Signed native-coin contribution of the transaction to `address`.
pub(crate) fn amount<T: SignedTransaction>(tx: &T, address: &Address) -> Amount {
    let header = tx.header();
    let mut total = tx.native_delta(address);
    if &header.creator_address() == address {
        total = Amount::from_units(total.units().saturating_sub(header.fee.units()));
    }
    total
}

// ---------------------------------------------------------------------------
// Process / orphan frame
// ---------------------------------------------------------------------------

pub(crate) fn process<T: SignedTransaction>(
    tx: &T,
    db: &mut DatabaseSet,
) -> Result<(), LedgerError> {
    let header = tx.header();
    let creator = header.creator_address();
    let mut journal = Journal::default();

    debit(db, &creator, NATIVE_ASSET_KEY, header.fee)?;
    set_reference(db, &mut journal, creator, &header.signature)?;
    collect_fee(db, &mut journal, header)?;

    let detail = tx.apply(db, &mut journal)?;
    db.put_undo_record(&header.signature, &journal.finish(detail))?;

    debug!(kind = %T::TYPE, signature = %header.signature.short(), "processed");
    Ok(())
}

pub(crate) fn orphan<T: SignedTransaction>(
    tx: &T,
    db: &mut DatabaseSet,
) -> Result<(), LedgerError> {
    let header = tx.header();
    let creator = header.creator_address();
    let record = db
        .undo_record(&header.signature)?
        .ok_or_else(|| LedgerError::MissingUndoRecord(header.signature.short()))?;

    if db.reference(&creator)?.as_ref() != Some(&header.signature) {
        warn!(kind = %T::TYPE, signature = %header.signature.short(), "orphan out of order");
        return Err(LedgerError::InvariantViolation(format!(
            "last reference of {} is not {}",
            creator,
            header.signature.short()
        )));
    }

    tx.revert(db, record.detail)?;
    refund_fee(db, header.fee)?;
    credit(db, &creator, NATIVE_ASSET_KEY, header.fee)?;
    restore_references(db, record.references)?;
    db.delete_undo_record(&header.signature)?;

    debug!(kind = %T::TYPE, signature = %header.signature.short(), "orphaned");
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Balance, then reference, then fee sign.
///
/// `native_out` is the native coin the payload spends on top of the fee.
pub(crate) fn check_common(
    header: &TransactionHeader,
    db: &DatabaseSet,
    native_out: Amount,
) -> DbResult<ValidationResult> {
    let creator = header.creator_address();
    let Some(required) = native_out.checked_add(header.fee) else {
        return Ok(ValidationResult::NoBalance);
    };
    if db.balance(&creator, NATIVE_ASSET_KEY)? < required {
        return Ok(ValidationResult::NoBalance);
    }
    if db.reference(&creator)?.as_ref() != Some(&header.reference) {
        return Ok(ValidationResult::InvalidReference);
    }
    if !header.fee.is_positive() {
        return Ok(ValidationResult::NegativeFee);
    }
    Ok(ValidationResult::Ok)
}

/// Native coin always exists; issued assets must be registered.
pub(crate) fn asset_exists(db: &DatabaseSet, key: u64) -> DbResult<bool> {
    if key == NATIVE_ASSET_KEY {
        return Ok(true);
    }
    db.contains_asset(key)
}

/// Whether `amount` is a legal quantity of asset `key`. Unknown assets
/// report divisible; existence is checked separately.
pub(crate) fn fits_divisibility(db: &DatabaseSet, key: u64, amount: Amount) -> DbResult<bool> {
    if key == NATIVE_ASSET_KEY {
        return Ok(true);
    }
    Ok(match db.asset(key)? {
        Some(asset) => asset.divisible || amount.is_whole(),
        None => true,
    })
}

pub(crate) fn is_divisible(db: &DatabaseSet, key: u64) -> DbResult<bool> {
    if key == NATIVE_ASSET_KEY {
        return Ok(true);
    }
    Ok(db.asset(key)?.map(|a| a.divisible).unwrap_or(true))
}

// ---------------------------------------------------------------------------
// Mutation helpers
// ---------------------------------------------------------------------------

pub(crate) fn credit(
    db: &mut DatabaseSet,
    address: &Address,
    asset: u64,
    amount: Amount,
) -> Result<(), LedgerError> {
    let balance = db.balance(address, asset)?;
    let updated = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
    db.set_balance(address, asset, updated)?;
    Ok(())
}

pub(crate) fn debit(
    db: &mut DatabaseSet,
    address: &Address,
    asset: u64,
    amount: Amount,
) -> Result<(), LedgerError> {
    let balance = db.balance(address, asset)?;
    let updated = balance.checked_sub(amount).ok_or(LedgerError::Overflow)?;
    if updated.is_negative() {
        warn!(%address, asset, "balance would go negative");
        return Err(LedgerError::InvariantViolation(format!(
            "balance of {} in asset {} would go negative",
            address, asset
        )));
    }
    db.set_balance(address, asset, updated)?;
    Ok(())
}

/// Route the fee per policy. A treasury is a credited account like any
/// other: it gets its first reference from the fee that funds it.
fn collect_fee(
    db: &mut DatabaseSet,
    journal: &mut Journal,
    header: &TransactionHeader,
) -> Result<(), LedgerError> {
    if let FeePolicy::Treasury(treasury) = db.fee_policy().clone() {
        credit(db, &treasury, NATIVE_ASSET_KEY, header.fee)?;
        init_reference_if_absent(db, journal, treasury, &header.signature)?;
    }
    Ok(())
}

fn refund_fee(db: &mut DatabaseSet, fee: Amount) -> Result<(), LedgerError> {
    if let FeePolicy::Treasury(treasury) = db.fee_policy().clone() {
        debit(db, &treasury, NATIVE_ASSET_KEY, fee)?;
    }
    Ok(())
}

/// Point `address` at `signature`, journaling the prior value.
pub(crate) fn set_reference(
    db: &mut DatabaseSet,
    journal: &mut Journal,
    address: Address,
    signature: &Signature,
) -> DbResult<()> {
    let prior = db.reference(&address)?;
    journal.record_reference(address, prior);
    db.set_reference(&address, Some(signature))
}

/// Give a credited account its first reference. Accounts that already have
/// one keep it.
pub(crate) fn init_reference_if_absent(
    db: &mut DatabaseSet,
    journal: &mut Journal,
    address: Address,
    signature: &Signature,
) -> DbResult<()> {
    if db.reference(&address)?.is_none() {
        set_reference(db, journal, address, signature)?;
    }
    Ok(())
}

pub(crate) fn restore_references(
    db: &mut DatabaseSet,
    references: Vec<(Address, Option<Signature>)>,
) -> DbResult<()> {
    for (address, prior) in references.into_iter().rev() {
        db.set_reference(&address, prior.as_ref())?;
    }
    Ok(())
}
