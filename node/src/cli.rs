//! # CLI Interface
//!
//! Defines the command-line argument structure for `namechain-node` using
//! `clap` derive. Every subcommand works on the ledger found through the
//! global `--config` and `--data-dir` options.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use namechain_protocol::account::Address;
use namechain_protocol::transaction::Amount;

/// Namechain ledger operator.
///
/// Creates a persistent ledger, applies and rolls back blocks, and answers
/// balance and name queries against it.
#[derive(Parser, Debug)]
#[command(
    name = "namechain-node",
    about = "Namechain ledger operator CLI",
    version,
    propagate_version = true
)]
pub struct NamechainCli {
    /// Ledger configuration file (TOML).
    #[arg(long, short = 'c', global = true, env = "NAMECHAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ledger directory. Overrides `data_dir` from the config file.
    #[arg(long, short = 'd', global = true, env = "NAMECHAIN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "NAMECHAIN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger and apply genesis allocations as its first block.
    Init(InitArgs),
    /// Derive an address from a passphrase, or generate a fresh key.
    Keygen(KeygenArgs),
    /// Decode a hex transaction and print it as JSON.
    Inspect(TransactionArg),
    /// Check a hex transaction against the current ledger.
    Validate(TransactionArg),
    /// Apply a hex transaction as a one-transaction block.
    Submit(TransactionArg),
    /// Build and sign a payment from the ledger's current reference.
    Pay(PayArgs),
    /// Orphan the newest block.
    Rollback,
    /// Print the balance of an address.
    Balance(BalanceArgs),
    /// Look up a registered name.
    Name(NameArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Genesis allocation as `ADDRESS=AMOUNT`. Repeatable.
    #[arg(long = "alloc", value_parser = parse_allocation, required = true)]
    pub allocations: Vec<(Address, Amount)>,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Passphrase to derive the key from. A random key is generated when
    /// omitted.
    #[arg(long, env = "NAMECHAIN_PASSPHRASE")]
    pub passphrase: Option<String>,
}

#[derive(Args, Debug)]
pub struct TransactionArg {
    /// Hex-encoded transaction bytes.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct PayArgs {
    /// Passphrase of the paying account.
    #[arg(long, env = "NAMECHAIN_PASSPHRASE")]
    pub passphrase: String,

    /// Recipient address.
    #[arg(long)]
    pub to: Address,

    /// Amount in coins, e.g. `12.5`.
    #[arg(long)]
    pub amount: Amount,

    /// Fee in coins. Defaults to one coin.
    #[arg(long)]
    pub fee: Option<Amount>,
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    pub address: Address,

    /// Asset key. `0` is the native coin.
    #[arg(long, default_value_t = 0)]
    pub asset: u64,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    pub name: String,
}

fn parse_allocation(s: &str) -> Result<(Address, Amount), String> {
    let (address, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=AMOUNT, got `{s}`"))?;
    let address = address.trim().parse::<Address>().map_err(|e| e.to_string())?;
    let amount = amount.trim().parse::<Amount>().map_err(|e| e.to_string())?;
    Ok((address, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use namechain_protocol::crypto::Keypair;

    #[test]
    fn verify_cli_structure() {
        NamechainCli::command().debug_assert();
    }

    #[test]
    fn allocation_parses_address_and_amount() {
        let address = Address::from_public_key(&Keypair::from_passphrase("alloc").public_key());
        let (parsed, amount) = parse_allocation(&format!("{address}=12.5")).unwrap();
        assert_eq!(parsed, address);
        assert_eq!(amount, "12.5".parse::<Amount>().unwrap());

        assert!(parse_allocation("no-separator").is_err());
        assert!(parse_allocation(&format!("{address}=lots")).is_err());
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = NamechainCli::try_parse_from([
            "namechain-node",
            "rollback",
            "--data-dir",
            "/tmp/ledger",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Rollback));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/ledger")));
        assert_eq!(cli.log_format, "json");
    }
}
