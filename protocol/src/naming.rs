//! # Names
//!
//! A name is a unique, lower-case UTF-8 key owned by one account and carrying
//! a free-form value. Names can be listed for sale ([`NameSale`]) and bought
//! by another account, which moves ownership and deletes the listing.
//!
//! ```text
//! unregistered ──RegisterName──▶ registered ──SellName──▶ for sale
//!                                    ▲                        │
//!                                    └──BuyName (new owner)───┘
//!                                    └──CancelSellName────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::account::Address;
use crate::transaction::Amount;

/// A registered name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub owner: Address,
    pub name: String,
    pub value: String,
}

impl Name {
    pub fn new(owner: Address, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An open listing offering a name for a fixed amount of the native coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSale {
    pub name: String,
    pub amount: Amount,
}

impl NameSale {
    pub fn new(name: impl Into<String>, amount: Amount) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Names and poll names must already be in lower case. Characters without a
/// case distinction pass.
pub fn is_lower_case(text: &str) -> bool {
    text.to_lowercase() == text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_case_check() {
        assert!(is_lower_case("test"));
        assert!(is_lower_case("name-42 ünïcode"));
        assert!(is_lower_case("名前"));
        assert!(!is_lower_case("Test"));
        assert!(!is_lower_case("ÜBER"));
    }
}
