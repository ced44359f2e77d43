//! # Assets & the Exchange
//!
//! User-issued assets live next to the native coin (asset key 0). Holders
//! trade them through standing orders:
//!
//! - An [`Order`] offers `amount` of its *have* asset at `price` units of
//!   its *want* asset per unit of *have*.
//! - A new order is matched against open orders on the opposite side of the
//!   book. Every fill is recorded as a [`Trade`].
//!
//! Fills execute at the resting (target) order's price. All arithmetic runs
//! in `i128` over raw 10^-8 units so that products of two amounts cannot
//! overflow.

use serde::{Deserialize, Serialize};

use crate::account::Address;
use crate::config::UNITS_PER_COIN;
use crate::crypto::Signature;
use crate::transaction::Amount;

/// An issued asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub key: u64,
    pub owner: Address,
    pub name: String,
    pub description: String,
    pub quantity: Amount,
    pub divisible: bool,
    /// Signature of the IssueAsset transaction that created it.
    pub reference: Signature,
}

/// A standing exchange order, identified by the signature of the
/// CreateOrder transaction that placed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Signature,
    pub creator: Address,
    pub have: u64,
    pub want: u64,
    pub amount: Amount,
    pub price: Amount,
    pub fulfilled: Amount,
    pub timestamp: i64,
}

impl Order {
    /// Portion of `amount` still open.
    pub fn remaining(&self) -> Amount {
        Amount::from_units(self.amount.units() - self.fulfilled.units())
    }

    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled >= self.amount
    }

    /// Whether this order and `other` sit on opposite sides of the same
    /// market with overlapping prices (`p * q <= 1`).
    pub fn crosses(&self, other: &Order) -> bool {
        let one = (UNITS_PER_COIN as i128) * (UNITS_PER_COIN as i128);
        self.have == other.want
            && self.want == other.have
            && (self.price.units() as i128) * (other.price.units() as i128) <= one
    }
}

/// One fill between an incoming order (initiator) and a resting order
/// (target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub initiator: Signature,
    pub target: Signature,
    /// Received by the initiator, in the initiator's *want* asset.
    pub amount: Amount,
    /// Received by the target, in the initiator's *have* asset.
    pub price: Amount,
    pub timestamp: i64,
}

/// Size one fill.
///
/// `initiator_remaining` is in the initiator's *have* asset A, the target
/// offers `target_remaining` of B at `target_price` A per B. Returns
/// `(b, a)`: B received by the initiator, A received by the target. `None`
/// when nothing can be filled.
pub fn fill(
    initiator_remaining: Amount,
    target_remaining: Amount,
    target_price: Amount,
    want_divisible: bool,
    have_divisible: bool,
) -> Option<(Amount, Amount)> {
    let unit = UNITS_PER_COIN as i128;
    let q = target_price.units() as i128;
    if q <= 0 {
        return None;
    }
    let rem_a = initiator_remaining.units() as i128;
    let affordable = rem_a * unit / q;
    let mut b = affordable.min(target_remaining.units() as i128);
    if !want_divisible {
        b -= b % unit;
    }
    if b <= 0 {
        return None;
    }
    let mut a = (b * q + unit - 1) / unit;
    if !have_divisible && a % unit != 0 {
        a += unit - a % unit;
    }
    if a > rem_a || a <= 0 {
        return None;
    }
    Some((
        Amount::from_units(i64::try_from(b).ok()?),
        Amount::from_units(i64::try_from(a).ok()?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn coins(n: i64) -> Amount {
        Amount::from_coins(n)
    }

    fn order(have: u64, want: u64, amount: Amount, price: Amount) -> Order {
        Order {
            id: Keypair::generate().sign(b"order"),
            creator: Address::from_public_key(&Keypair::from_passphrase("c").public_key()),
            have,
            want,
            amount,
            price,
            fulfilled: Amount::ZERO,
            timestamp: 0,
        }
    }

    #[test]
    fn crossing_requires_opposite_sides_and_price_overlap() {
        // Seller asks 2 native per unit of asset 1.
        let sell = order(1, 0, coins(10), coins(2));
        // Buyers ask for asset-1 units per native coin.
        let buy_exact = order(0, 1, coins(10), Amount::from_units(50_000_000));
        let buy_generous = order(0, 1, coins(10), Amount::from_units(40_000_000));
        let buy_greedy = order(0, 1, coins(10), Amount::from_units(60_000_000));
        let same_side = order(1, 0, coins(10), Amount::from_units(1));

        assert!(sell.crosses(&buy_exact));
        assert!(sell.crosses(&buy_generous));
        assert!(!sell.crosses(&buy_greedy));
        assert!(!sell.crosses(&same_side));
    }

    #[test]
    fn fill_limited_by_target() {
        // Initiator has 100 A; target sells 10 B at 2 A each.
        let (b, a) = fill(coins(100), coins(10), coins(2), true, true).unwrap();
        assert_eq!(b, coins(10));
        assert_eq!(a, coins(20));
    }

    #[test]
    fn fill_limited_by_initiator() {
        // Initiator has 5 A; target sells 10 B at 2 A each.
        let (b, a) = fill(coins(5), coins(10), coins(2), true, true).unwrap();
        assert_eq!(b, Amount::from_units(250_000_000));
        assert_eq!(a, coins(5));
    }

    #[test]
    fn indivisible_want_rounds_down() {
        let (b, a) = fill(coins(5), coins(10), coins(2), false, true).unwrap();
        assert_eq!(b, coins(2));
        assert_eq!(a, coins(4));
    }

    #[test]
    fn nothing_to_fill() {
        assert!(fill(coins(1), coins(10), coins(2), false, true).is_none());
        assert!(fill(Amount::ZERO, coins(10), coins(2), true, true).is_none());
    }

    #[test]
    fn remaining_and_fulfilled() {
        let mut o = order(1, 2, coins(10), coins(1));
        o.fulfilled = coins(4);
        assert_eq!(o.remaining(), coins(6));
        assert!(!o.is_fulfilled());
        o.fulfilled = coins(10);
        assert!(o.is_fulfilled());
    }
}
