//! Exchange orders.
//!
//! Placing an order escrows its *have* amount, then walks the opposite side
//! of the book cheapest-first and fills against every crossing order. Each
//! fill is stored as a [`Trade`] keyed by the initiating order, which is all
//! the orphan path needs to unwind the match.

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::codec::{put_amount, Reader};
use super::common::{
    asset_exists, check_common, credit, debit, fits_divisibility, init_reference_if_absent,
    is_divisible, HeaderPrefix, SignedTransaction, TransactionHeader,
};
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::account::Address;
use crate::assets::{fill, Order, Trade};
use crate::config::{AMOUNT_LENGTH, ASSET_KEY_LENGTH, NATIVE_ASSET_KEY, SIGNATURE_LENGTH};
use crate::crypto::Signature;
use crate::storage::{DatabaseSet, DbResult};

fn add(a: Amount, b: Amount) -> Result<Amount, LedgerError> {
    a.checked_add(b).ok_or(LedgerError::Overflow)
}

fn sub(a: Amount, b: Amount) -> Result<Amount, LedgerError> {
    a.checked_sub(b).ok_or(LedgerError::Overflow)
}

/// Balance check for spending `amount` of `asset` plus the fee.
fn check_funds(
    header: &TransactionHeader,
    db: &DatabaseSet,
    asset: u64,
    amount: Amount,
) -> DbResult<ValidationResult> {
    if asset == NATIVE_ASSET_KEY {
        return check_common(header, db, amount);
    }
    if db.balance(&header.creator_address(), asset)? < amount {
        return Ok(ValidationResult::NoBalance);
    }
    check_common(header, db, Amount::ZERO)
}

// ---------------------------------------------------------------------------
// CreateOrder
// ---------------------------------------------------------------------------

/// Wire payload: `have u64 | want u64 | amount i64 | price i64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderTransaction {
    pub header: TransactionHeader,
    pub have: u64,
    pub want: u64,
    pub amount: Amount,
    pub price: Amount,
}

impl CreateOrderTransaction {
    pub fn new(
        header: TransactionHeader,
        have: u64,
        want: u64,
        amount: Amount,
        price: Amount,
    ) -> Self {
        Self {
            header,
            have,
            want,
            amount,
            price,
        }
    }

    /// The order this transaction places, before any matching.
    pub fn order(&self) -> Order {
        Order {
            id: self.header.signature.clone(),
            creator: self.header.creator_address(),
            have: self.have,
            want: self.want,
            amount: self.amount,
            price: self.price,
            fulfilled: Amount::ZERO,
            timestamp: self.header.timestamp,
        }
    }

    fn match_order(
        &self,
        db: &mut DatabaseSet,
        journal: &mut Journal,
        order: &mut Order,
    ) -> Result<(), LedgerError> {
        let want_divisible = is_divisible(db, self.want)?;
        let have_divisible = is_divisible(db, self.have)?;

        for mut target in db.orders_for_pair(self.want, self.have)? {
            if order.is_fulfilled() || !order.crosses(&target) {
                break;
            }
            let Some((bought, paid)) = fill(
                order.remaining(),
                target.remaining(),
                target.price,
                want_divisible,
                have_divisible,
            ) else {
                continue;
            };

            credit(db, &order.creator, self.want, bought)?;
            credit(db, &target.creator, self.have, paid)?;
            init_reference_if_absent(db, journal, target.creator, &self.header.signature)?;

            order.fulfilled = add(order.fulfilled, paid)?;
            target.fulfilled = add(target.fulfilled, bought)?;
            db.put_trade(&Trade {
                initiator: order.id.clone(),
                target: target.id.clone(),
                amount: bought,
                price: paid,
                timestamp: self.header.timestamp,
            })?;
            trace!(target = %target.id.short(), %bought, %paid, "order filled");

            if target.is_fulfilled() {
                db.delete_order(&target.id)?;
                db.put_completed_order(&target)?;
            } else {
                db.put_order(&target)?;
            }
        }
        Ok(())
    }
}

impl SignedTransaction for CreateOrderTransaction {
    const TYPE: TransactionType = TransactionType::CreateOrder;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        2 * ASSET_KEY_LENGTH + 2 * AMOUNT_LENGTH
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.put_u64(self.have);
        buf.put_u64(self.want);
        put_amount(buf, self.amount);
        put_amount(buf, self.price);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let have = reader.u64("have")?;
        let want = reader.u64("want")?;
        let amount = reader.amount("amount")?;
        let price = reader.amount("price")?;
        Ok(Self::new(prefix.finish(reader)?, have, want, amount, price))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if self.have == self.want {
            return Ok(ValidationResult::HaveEqualsWant);
        }
        if !self.amount.is_positive() {
            return Ok(ValidationResult::NegativeAmount);
        }
        if !self.price.is_positive() {
            return Ok(ValidationResult::NegativePrice);
        }
        if !asset_exists(db, self.have)? || !asset_exists(db, self.want)? {
            return Ok(ValidationResult::AssetDoesNotExist);
        }
        if !fits_divisibility(db, self.have, self.amount)? {
            return Ok(ValidationResult::InvalidAmount);
        }
        check_funds(&self.header, db, self.have, self.amount)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let mut order = self.order();
        debit(db, &order.creator, self.have, self.amount)?;
        self.match_order(db, journal, &mut order)?;

        if order.is_fulfilled() {
            db.put_completed_order(&order)?;
        } else {
            db.put_order(&order)?;
        }
        Ok(UndoDetail::None)
    }

    fn revert(&self, db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        let creator = self.header.creator_address();
        let id = &self.header.signature;

        for trade in db.trades_initiated_by(id)?.into_iter().rev() {
            let mut target = match db.completed_order(&trade.target)? {
                Some(order) => {
                    db.delete_completed_order(&trade.target)?;
                    order
                }
                None => db.order(&trade.target)?.ok_or_else(|| {
                    LedgerError::InvariantViolation(format!(
                        "trade target {} missing",
                        trade.target.short()
                    ))
                })?,
            };
            debit(db, &creator, self.want, trade.amount)?;
            debit(db, &target.creator, self.have, trade.price)?;
            target.fulfilled = sub(target.fulfilled, trade.amount)?;
            db.put_order(&target)?;
            db.delete_trade(&trade)?;
        }

        db.delete_order(id)?;
        db.delete_completed_order(id)?;
        credit(db, &creator, self.have, self.amount)?;
        Ok(())
    }

    /// Escrow only. Native coin received through fills depends on the book.
    fn native_delta(&self, address: &Address) -> Amount {
        if self.have == NATIVE_ASSET_KEY && address == &self.header.creator_address() {
            self.amount.checked_neg().unwrap_or(Amount::ZERO)
        } else {
            Amount::ZERO
        }
    }
}

// ---------------------------------------------------------------------------
// CancelOrder
// ---------------------------------------------------------------------------

/// Wire payload: `order id [64]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderTransaction {
    pub header: TransactionHeader,
    pub order: Signature,
}

impl CancelOrderTransaction {
    pub fn new(header: TransactionHeader, order: Signature) -> Self {
        Self { header, order }
    }
}

impl SignedTransaction for CancelOrderTransaction {
    const TYPE: TransactionType = TransactionType::CancelOrder;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        SIGNATURE_LENGTH
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.put_slice(self.order.as_bytes());
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let order = reader.signature("order")?;
        Ok(Self::new(prefix.finish(reader)?, order))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        let Some(order) = db.order(&self.order)? else {
            return Ok(ValidationResult::OrderDoesNotExist);
        };
        if order.creator != self.header.creator_address() {
            return Ok(ValidationResult::InvalidOrderCreator);
        }
        check_common(&self.header, db, Amount::ZERO)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let order = db.order(&self.order)?.ok_or_else(|| {
            LedgerError::InvariantViolation(format!("order {} missing", self.order.short()))
        })?;
        db.delete_order(&order.id)?;
        credit(db, &order.creator, order.have, order.remaining())?;
        Ok(UndoDetail::CancelledOrder(order))
    }

    fn revert(&self, db: &mut DatabaseSet, detail: UndoDetail) -> Result<(), LedgerError> {
        let UndoDetail::CancelledOrder(order) = detail else {
            return Err(LedgerError::InvariantViolation(
                "cancel order undo record holds no order".into(),
            ));
        };
        debit(db, &order.creator, order.have, order.remaining())?;
        db.put_order(&order)?;
        Ok(())
    }
}
