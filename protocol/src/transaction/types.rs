//! Core type definitions for Namechain transactions.
//!
//! These types form the vocabulary of every transaction on the ledger:
//! the wire discriminant, the fixed-point [`Amount`], and the
//! [`ValidationResult`] codes that validation reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{AMOUNT_DECIMALS, UNITS_PER_COIN};

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// Discriminant for the operation a transaction represents.
///
/// The numeric value is the leading big-endian `u32` of the wire encoding and
/// must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TransactionType {
    Genesis = 1,
    Payment = 2,
    RegisterName = 3,
    UpdateName = 4,
    SellName = 5,
    CancelSellName = 6,
    BuyName = 7,
    CreatePoll = 8,
    VoteOnPoll = 9,
    ArbitraryData = 10,
    IssueAsset = 11,
    TransferAsset = 12,
    CreateOrder = 13,
    CancelOrder = 14,
}

impl TransactionType {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Genesis,
            2 => Self::Payment,
            3 => Self::RegisterName,
            4 => Self::UpdateName,
            5 => Self::SellName,
            6 => Self::CancelSellName,
            7 => Self::BuyName,
            8 => Self::CreatePoll,
            9 => Self::VoteOnPoll,
            10 => Self::ArbitraryData,
            11 => Self::IssueAsset,
            12 => Self::TransferAsset,
            13 => Self::CreateOrder,
            14 => Self::CancelOrder,
            _ => return None,
        })
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A fixed-point amount with 8 fractional digits.
///
/// Stored as a signed count of 10^-8 units. Negative values are legal to
/// construct so that validation can reject them with a proper result code;
/// balances themselves never go negative.
///
/// ```
/// use namechain_protocol::transaction::Amount;
///
/// let fee = Amount::from_coins(1);
/// assert_eq!(fee.to_string(), "1.00000000");
/// assert_eq!("0.5".parse::<Amount>().unwrap().units(), 50_000_000);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from raw 10^-8 units.
    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Build from whole coins. Saturates on overflow.
    pub const fn from_coins(coins: i64) -> Self {
        Self(coins.saturating_mul(UNITS_PER_COIN))
    }

    pub const fn units(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True when the fractional part is zero. Indivisible assets only move
    /// in whole units.
    pub fn is_whole(self) -> bool {
        self.0 % UNITS_PER_COIN == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_neg(self) -> Option<Amount> {
        self.0.checked_neg().map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let divisor = UNITS_PER_COIN as u64;
        write!(
            f,
            "{}{}.{:0>width$}",
            sign,
            abs / divisor,
            abs % divisor,
            width = AMOUNT_DECIMALS as usize
        )
    }
}

/// Error parsing a decimal amount string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount: {0}")]
pub struct AmountParseError(String);

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AmountParseError(s.to_string());
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || frac.len() > AMOUNT_DECIMALS as usize {
            return Err(err());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let whole: i64 = whole.parse().map_err(|_| err())?;
        let frac_units: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = AMOUNT_DECIMALS as usize);
            padded.parse().map_err(|_| err())?
        };
        let units = whole
            .checked_mul(UNITS_PER_COIN)
            .and_then(|w| w.checked_add(frac_units))
            .ok_or_else(err)?;
        Ok(Amount(if negative { -units } else { units }))
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Outcome of validating a transaction against ledger state.
///
/// Not an error type: a failing code is a normal answer. The integer values
/// are stable and exposed through [`ValidationResult::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValidationResult {
    Ok = 1,
    InvalidAddress = 2,
    NegativeAmount = 3,
    NegativeFee = 4,
    NoBalance = 5,
    InvalidReference = 6,
    InvalidNameLength = 7,
    InvalidValueLength = 8,
    NameAlreadyRegistered = 9,
    NameDoesNotExist = 10,
    InvalidNameOwner = 11,
    NameAlreadyForSale = 12,
    NameNotForSale = 13,
    BuyerAlreadyOwner = 14,
    InvalidAmount = 15,
    InvalidSeller = 16,
    NameNotLowerCase = 17,
    InvalidDescriptionLength = 18,
    InvalidOptionsLength = 19,
    InvalidOptionLength = 20,
    DuplicateOption = 21,
    PollAlreadyCreated = 22,
    PollDoesNotExist = 23,
    PollOptionDoesNotExist = 24,
    AlreadyVotedForThatOption = 25,
    InvalidDataLength = 26,
    InvalidQuantity = 27,
    AssetDoesNotExist = 28,
    HaveEqualsWant = 29,
    NegativePrice = 30,
    OrderDoesNotExist = 31,
    InvalidOrderCreator = 32,
    InvalidSignature = 33,
}

impl ValidationResult {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_ids_are_stable() {
        assert_eq!(TransactionType::Genesis.as_u32(), 1);
        assert_eq!(TransactionType::BuyName.as_u32(), 7);
        assert_eq!(TransactionType::CancelOrder.as_u32(), 14);
        for id in 1..=14 {
            assert_eq!(TransactionType::from_u32(id).unwrap().as_u32(), id);
        }
        assert!(TransactionType::from_u32(0).is_none());
        assert!(TransactionType::from_u32(15).is_none());
    }

    #[test]
    fn amount_display() {
        assert_eq!(Amount::from_coins(1000).to_string(), "1000.00000000");
        assert_eq!(Amount::from_units(1).to_string(), "0.00000001");
        assert_eq!(Amount::from_units(-50_000_000).to_string(), "-0.50000000");
    }

    #[test]
    fn amount_parse() {
        assert_eq!("1".parse::<Amount>().unwrap(), Amount::from_coins(1));
        assert_eq!(
            "12.34".parse::<Amount>().unwrap(),
            Amount::from_units(1_234_000_000)
        );
        assert_eq!(
            "-5".parse::<Amount>().unwrap(),
            Amount::from_coins(-5)
        );
        assert!("1.123456789".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
        assert!(".5".parse::<Amount>().is_err());
        assert!("1.2.3".parse::<Amount>().is_err());
    }

    #[test]
    fn amount_predicates() {
        assert!(Amount::ZERO.is_zero());
        assert!(Amount::from_coins(-1).is_negative());
        assert!(Amount::from_coins(3).is_whole());
        assert!(!Amount::from_units(150_000_000).is_whole());
        assert!(Amount::from_units(i64::MAX)
            .checked_add(Amount::from_units(1))
            .is_none());
    }

    #[test]
    fn validation_codes_are_distinct() {
        let all = [
            ValidationResult::Ok,
            ValidationResult::InvalidAddress,
            ValidationResult::NegativeAmount,
            ValidationResult::NegativeFee,
            ValidationResult::NoBalance,
            ValidationResult::InvalidReference,
            ValidationResult::BuyerAlreadyOwner,
            ValidationResult::InvalidSignature,
        ];
        let mut codes: Vec<u8> = all.iter().map(|r| r.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert!(ValidationResult::Ok.is_ok());
        assert!(!ValidationResult::NoBalance.is_ok());
    }
}
