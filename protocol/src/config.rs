//! # Protocol Configuration & Constants
//!
//! Every consensus-relevant number in Namechain lives here: wire widths,
//! transaction discriminants, field length limits. Two nodes that disagree
//! on any of these will disagree on which transactions are valid, so treat
//! this file as part of the consensus rules.
//!
//! The runtime-tunable part of the engine is [`LedgerConfig`], loaded from
//! TOML. It carries the fee routing policy, which is deliberately a
//! configuration point rather than a hidden constant.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::account::Address;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 seed / secret key length in bytes.
pub const SEED_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Also the width of every `reference` field.
pub const SIGNATURE_LENGTH: usize = 64;

/// Address version byte. Base58 addresses with this version start with `Q`.
pub const ADDRESS_VERSION: u8 = 58;

/// Raw address length: version (1) + key hash (20) + checksum (4).
pub const ADDRESS_LENGTH: usize = 25;

/// Length of the public-key hash embedded in an address.
pub const ADDRESS_HASH_LENGTH: usize = 20;

/// Length of the trailing address checksum.
pub const ADDRESS_CHECKSUM_LENGTH: usize = 4;

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Width of the leading type discriminant.
pub const TYPE_LENGTH: usize = 4;

/// Width of the millisecond timestamp.
pub const TIMESTAMP_LENGTH: usize = 8;

/// Width of a fixed-point amount (signed 64-bit count of 10^-8 units).
pub const AMOUNT_LENGTH: usize = 8;

/// Width of the length prefix in front of every variable-length field.
pub const LENGTH_PREFIX_LENGTH: usize = 4;

/// Width of an asset key.
pub const ASSET_KEY_LENGTH: usize = 8;

/// Fixed part shared by every signed transaction:
/// type + timestamp + reference + creator + fee + signature.
pub const BASE_LENGTH: usize = TYPE_LENGTH
    + TIMESTAMP_LENGTH
    + SIGNATURE_LENGTH
    + PUBLIC_KEY_LENGTH
    + AMOUNT_LENGTH
    + SIGNATURE_LENGTH;

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Number of fractional digits in every amount.
pub const AMOUNT_DECIMALS: u32 = 8;

/// Units per whole coin (10^8).
pub const UNITS_PER_COIN: i64 = 100_000_000;

/// Asset key of the native coin. User-issued assets start at 1.
pub const NATIVE_ASSET_KEY: u64 = 0;

/// First key handed out by IssueAsset.
pub const FIRST_ISSUED_ASSET_KEY: u64 = 1;

// ---------------------------------------------------------------------------
// Field Limits
// ---------------------------------------------------------------------------

/// Maximum name length in UTF-8 bytes (names, poll names, asset names).
pub const MAX_NAME_LENGTH: usize = 400;

/// Maximum name value length in UTF-8 bytes.
pub const MAX_VALUE_LENGTH: usize = 4000;

/// Maximum description length for polls and assets.
pub const MAX_DESCRIPTION_LENGTH: usize = 4000;

/// Maximum number of options in a poll.
pub const MAX_POLL_OPTIONS: usize = 100;

/// Maximum arbitrary-data payload in bytes.
pub const MAX_ARBITRARY_DATA_LENGTH: usize = 4000;

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Errors while loading a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid treasury address: {0}")]
    InvalidTreasury(String),
}

/// Where transaction fees go once debited from the signer.
///
/// Paying block generators happens above this engine, so the ledger either
/// burns fees or credits a configured treasury account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeePolicy {
    /// Fees leave circulation.
    #[default]
    Burn,
    /// Fees are credited to this account's native balance.
    Treasury(Address),
}

/// Runtime configuration for a ledger instance.
///
/// ```toml
/// data_dir = "/var/lib/namechain"
/// genesis_timestamp = 1400000000000
/// fee_policy = { treasury = "Q..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding the persistent ledger.
    pub data_dir: PathBuf,
    /// Fee routing.
    pub fee_policy: FeePolicy,
    /// Timestamp stamped on genesis transactions created by `init`.
    pub genesis_timestamp: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            fee_policy: FeePolicy::Burn,
            genesis_timestamp: 1_400_000_000_000,
        }
    }
}

impl LedgerConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if let FeePolicy::Treasury(address) = &self.fee_policy {
            if !address.is_valid() {
                return Err(ConfigError::InvalidTreasury(address.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn base_length_matches_field_widths() {
        assert_eq!(BASE_LENGTH, 4 + 8 + 64 + 32 + 8 + 64);
    }

    #[test]
    fn address_layout_adds_up() {
        assert_eq!(
            ADDRESS_LENGTH,
            1 + ADDRESS_HASH_LENGTH + ADDRESS_CHECKSUM_LENGTH
        );
    }

    #[test]
    fn default_config_burns_fees() {
        let config = LedgerConfig::from_toml("").unwrap();
        assert_eq!(config.fee_policy, FeePolicy::Burn);
    }

    #[test]
    fn treasury_policy_from_toml() {
        let treasury = Address::from_public_key(&Keypair::from_passphrase("treasury").public_key());
        let text = format!(
            "data_dir = \"/tmp/ledger\"\nfee_policy = {{ treasury = \"{}\" }}\n",
            treasury
        );
        let config = LedgerConfig::from_toml(&text).unwrap();
        assert_eq!(config.fee_policy, FeePolicy::Treasury(treasury));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ledger"));
    }

    #[test]
    fn treasury_with_bad_checksum_rejected() {
        let treasury = Address::from_public_key(&Keypair::from_passphrase("treasury").public_key());
        let mut raw = *treasury.as_bytes();
        raw[24] ^= 0xFF;
        let text = format!(
            "fee_policy = {{ treasury = \"{}\" }}\n",
            Address::from_bytes(raw)
        );
        assert!(matches!(
            LedgerConfig::from_toml(&text),
            Err(ConfigError::InvalidTreasury(_))
        ));
    }
}
