//! # Addresses
//!
//! An address is 25 raw bytes:
//!
//! ```text
//! version (1) | double_sha256(public_key)[..20] | checksum (4)
//! ```
//!
//! where the checksum is the first four bytes of `double_sha256` over the
//! preceding 21 bytes. The text form is base58; with version byte 58 every
//! address starts with `Q`.
//!
//! Parsing only checks the length so that transactions carrying a corrupt
//! address still decode and can be rejected by validation with
//! `InvalidAddress`. [`Address::is_valid`] checks version and checksum.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ADDRESS_CHECKSUM_LENGTH, ADDRESS_HASH_LENGTH, ADDRESS_LENGTH, ADDRESS_VERSION};
use crate::crypto::{double_sha256, PublicKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is not valid base58")]
    InvalidBase58,

    #[error("address must be 25 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 25-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Derive the address controlled by `public_key`.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let hash = double_sha256(public_key.as_bytes());
        let mut raw = [0u8; ADDRESS_LENGTH];
        raw[0] = ADDRESS_VERSION;
        raw[1..1 + ADDRESS_HASH_LENGTH].copy_from_slice(&hash[..ADDRESS_HASH_LENGTH]);
        let checksum = Self::checksum(&raw[..1 + ADDRESS_HASH_LENGTH]);
        raw[1 + ADDRESS_HASH_LENGTH..].copy_from_slice(&checksum);
        Self(raw)
    }

    /// Wrap raw bytes without validating them.
    pub fn from_bytes(raw: [u8; ADDRESS_LENGTH]) -> Self {
        Self(raw)
    }

    pub fn try_from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        let raw: [u8; ADDRESS_LENGTH] = slice
            .try_into()
            .map_err(|_| AddressError::InvalidLength(slice.len()))?;
        Ok(Self(raw))
    }

    /// Decode the base58 text form. Checks length only.
    pub fn from_base58(text: &str) -> Result<Self, AddressError> {
        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58)?;
        Self::try_from_slice(&bytes)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Version byte and checksum both match.
    pub fn is_valid(&self) -> bool {
        if self.0[0] != ADDRESS_VERSION {
            return false;
        }
        let checksum = Self::checksum(&self.0[..1 + ADDRESS_HASH_LENGTH]);
        self.0[1 + ADDRESS_HASH_LENGTH..] == checksum
    }

    /// Whether `text` decodes to a valid address.
    pub fn is_valid_text(text: &str) -> bool {
        Self::from_base58(text).map(|a| a.is_valid()).unwrap_or(false)
    }

    fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECKSUM_LENGTH] {
        let digest = double_sha256(payload);
        let mut out = [0u8; ADDRESS_CHECKSUM_LENGTH];
        out.copy_from_slice(&digest[..ADDRESS_CHECKSUM_LENGTH]);
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

// Text form everywhere: config files, JSON output and stored records alike.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_base58(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn sample() -> Address {
        Address::from_public_key(&Keypair::from_passphrase("test").public_key())
    }

    #[test]
    fn derived_address_is_valid_and_starts_with_q() {
        let address = sample();
        assert!(address.is_valid());
        assert!(address.to_string().starts_with('Q'));
    }

    #[test]
    fn base58_roundtrip() {
        let address = sample();
        assert_eq!(Address::from_base58(&address.to_base58()).unwrap(), address);
    }

    #[test]
    fn corrupted_checksum_is_invalid_but_parses() {
        let mut raw = *sample().as_bytes();
        raw[3] ^= 0x01;
        let corrupt = Address::from_bytes(raw);
        assert!(!corrupt.is_valid());
        assert_eq!(Address::from_base58(&corrupt.to_base58()).unwrap(), corrupt);
        assert!(!Address::is_valid_text(&corrupt.to_base58()));
    }

    #[test]
    fn wrong_version_is_invalid() {
        let mut raw = *sample().as_bytes();
        raw[0] = 0;
        assert!(!Address::from_bytes(raw).is_valid());
    }

    #[test]
    fn bad_text_rejected() {
        assert_eq!(
            Address::from_base58("0OIl"),
            Err(AddressError::InvalidBase58)
        );
        assert!(matches!(
            Address::from_base58("abc"),
            Err(AddressError::InvalidLength(_))
        ));
    }

    #[test]
    fn distinct_keys_distinct_addresses() {
        let other = Address::from_public_key(&Keypair::from_passphrase("other").public_key());
        assert_ne!(sample(), other);
    }

    #[test]
    fn serde_uses_text_form() {
        let address = sample();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
