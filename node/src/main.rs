// Copyright (c) 2026 Namechain Developers. MIT License.
// See LICENSE for details.

//! # Namechain Node
//!
//! Entry point for the `namechain-node` binary. Parses CLI arguments,
//! initializes logging, opens the persistent ledger and runs one command
//! against it.
//!
//! Results go to stdout (JSON where the output is structured); logs go to
//! stderr.

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

use namechain_protocol::account::Address;
use namechain_protocol::clock::{Clock, SystemClock};
use namechain_protocol::config::LedgerConfig;
use namechain_protocol::crypto::Keypair;
use namechain_protocol::storage::{apply_block, orphan_block, DatabaseSet};
use namechain_protocol::transaction::{GenesisTransaction, Transaction, TransactionBuilder};

use cli::{Commands, NamechainCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let NamechainCli {
        config,
        data_dir,
        log_format,
        command,
    } = NamechainCli::parse();
    logging::init_logging(
        "namechain_node=info,namechain_protocol=info",
        LogFormat::from_str_lossy(&log_format),
    );
    let paths = LedgerPaths { config, data_dir };

    match command {
        Commands::Init(args) => with_ledger(&paths, |db, config| init_ledger(db, config, args)),
        Commands::Keygen(args) => keygen(args),
        Commands::Inspect(args) => inspect(&args.hex),
        Commands::Validate(args) => with_ledger(&paths, |db, _| validate(db, &args.hex)),
        Commands::Submit(args) => with_ledger(&paths, |db, _| submit(db, &args.hex)),
        Commands::Pay(args) => with_ledger(&paths, |db, _| pay(db, args)),
        Commands::Rollback => with_ledger(&paths, |db, _| rollback(db)),
        Commands::Balance(args) => with_ledger(&paths, |db, _| balance(db, args)),
        Commands::Name(args) => with_ledger(&paths, |db, _| lookup_name(db, &args.name)),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Where the ledger lives, as given on the command line.
struct LedgerPaths {
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl LedgerPaths {
    /// The config file if given, then the `--data-dir` override.
    fn resolve(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => LedgerConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        Ok(config)
    }
}

/// Opens the ledger, runs `command` against it and closes it again.
fn with_ledger<F>(paths: &LedgerPaths, command: F) -> Result<()>
where
    F: FnOnce(&mut DatabaseSet, &LedgerConfig) -> Result<()>,
{
    let config = paths.resolve()?;
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create ledger directory {}", config.data_dir.display())
    })?;
    let mut db = DatabaseSet::open(&config.data_dir, &config)
        .with_context(|| format!("failed to open ledger at {}", config.data_dir.display()))?;

    command(&mut db, &config)?;
    db.close().context("failed to close ledger")
}

fn validate(db: &mut DatabaseSet, hex_str: &str) -> Result<()> {
    let tx = decode(hex_str)?;
    let result = tx.check(db).context("ledger read failed")?;
    print_json(&json!({
        "signature": tx.signature().to_base58(),
        "result": result,
        "code": result.code(),
    }))
}

fn submit(db: &mut DatabaseSet, hex_str: &str) -> Result<()> {
    let tx = decode(hex_str)?;
    let block = apply_block(db, &[tx], SystemClock.now_millis()).context("transaction rejected")?;
    print_json(&json!({
        "height": block.height,
        "block": block.signature_hex(),
    }))
}

/// Prints a signed payment as hex, ready for `submit`.
fn pay(db: &mut DatabaseSet, args: cli::PayArgs) -> Result<()> {
    let keypair = Keypair::from_passphrase(&args.passphrase);
    let mut builder = TransactionBuilder::new(&keypair)
        .reference_from(db)
        .context("failed to read account reference")?;
    if let Some(fee) = args.fee {
        builder = builder.fee(fee);
    }
    let tx = builder.payment(args.to, args.amount);
    println!("{}", hex::encode(tx.to_bytes()));
    Ok(())
}

fn rollback(db: &mut DatabaseSet) -> Result<()> {
    let block = orphan_block(db).context("rollback failed")?;
    print_json(&json!({
        "orphaned": block.height,
        "block": block.signature_hex(),
        "transactions": block.tx_count(),
    }))
}

fn balance(db: &mut DatabaseSet, args: cli::BalanceArgs) -> Result<()> {
    let balance = db
        .balance(&args.address, args.asset)
        .context("ledger read failed")?;
    print_json(&json!({
        "address": args.address,
        "asset": args.asset,
        "balance": balance.to_string(),
    }))
}

fn lookup_name(db: &mut DatabaseSet, name: &str) -> Result<()> {
    let Some(record) = db.name(name).context("ledger read failed")? else {
        bail!("name `{name}` is not registered");
    };
    let sale = db.name_sale(name).context("ledger read failed")?;
    print_json(&json!({
        "name": record,
        "for_sale": sale.map(|s| s.amount.to_string()),
    }))
}

/// Applies one genesis transaction per allocation as block 0.
fn init_ledger(db: &mut DatabaseSet, config: &LedgerConfig, args: cli::InitArgs) -> Result<()> {
    if let Some(height) = db.chain_height().context("ledger read failed")? {
        bail!(
            "ledger at {} already holds {} block(s)",
            config.data_dir.display(),
            height + 1
        );
    }

    let genesis: Vec<Transaction> = args
        .allocations
        .iter()
        .map(|(address, amount)| {
            GenesisTransaction::new(*address, *amount, config.genesis_timestamp).into()
        })
        .collect();
    let block = apply_block(db, &genesis, config.genesis_timestamp)
        .context("genesis block rejected")?;

    tracing::info!(
        data_dir = %config.data_dir.display(),
        allocations = genesis.len(),
        "ledger initialized"
    );
    print_json(&json!({
        "data_dir": config.data_dir.display().to_string(),
        "block": block.signature_hex(),
        "state_root": db.state_root_hex().context("ledger read failed")?,
    }))
}

fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let (keypair, secret) = match &args.passphrase {
        Some(passphrase) => (Keypair::from_passphrase(passphrase), None),
        None => {
            let keypair = Keypair::generate();
            let secret = hex::encode(keypair.secret_key_bytes());
            (keypair, Some(secret))
        }
    };
    let public_key = keypair.public_key();
    print_json(&json!({
        "address": Address::from_public_key(&public_key),
        "public_key": public_key.to_hex(),
        "secret_key": secret,
    }))
}

fn inspect(hex_str: &str) -> Result<()> {
    let tx = decode(hex_str)?;
    print_json(&json!({
        "type": tx.transaction_type().to_string(),
        "signature_valid": tx.is_signature_valid(),
        "length": tx.data_length(),
        "transaction": tx,
    }))
}

fn decode(hex_str: &str) -> Result<Transaction> {
    let bytes = hex::decode(hex_str.trim()).context("transaction is not valid hex")?;
    Transaction::parse(&bytes).context("failed to parse transaction")
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_version() {
    println!("namechain-node {}", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use namechain_protocol::transaction::Amount;

    fn address(passphrase: &str) -> Address {
        Address::from_public_key(&Keypair::from_passphrase(passphrase).public_key())
    }

    fn native(paths: &LedgerPaths, address: Address) -> Amount {
        let mut balance = Amount::ZERO;
        with_ledger(paths, |db, _| {
            balance = db.balance(&address, 0)?;
            Ok(())
        })
        .unwrap();
        balance
    }

    #[test]
    fn init_submit_and_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LedgerPaths {
            config: None,
            data_dir: Some(dir.path().join("ledger")),
        };
        let payer = address("payer");
        let recipient = address("recipient");
        let genesis = || cli::InitArgs {
            allocations: vec![(payer, Amount::from_coins(100))],
        };

        with_ledger(&paths, |db, config| init_ledger(db, config, genesis())).unwrap();
        assert!(with_ledger(&paths, |db, config| init_ledger(db, config, genesis())).is_err());
        assert_eq!(native(&paths, payer), Amount::from_coins(100));

        let mut signed = String::new();
        with_ledger(&paths, |db, _| {
            let tx = TransactionBuilder::new(&Keypair::from_passphrase("payer"))
                .reference_from(db)?
                .payment(recipient, Amount::from_coins(10));
            signed = hex::encode(tx.to_bytes());
            Ok(())
        })
        .unwrap();

        with_ledger(&paths, |db, _| submit(db, &signed)).unwrap();
        assert_eq!(native(&paths, payer), Amount::from_coins(89));
        assert_eq!(native(&paths, recipient), Amount::from_coins(10));

        // The same payment cannot be replayed: its reference is now stale.
        assert!(with_ledger(&paths, |db, _| submit(db, &signed)).is_err());

        with_ledger(&paths, |db, _| rollback(db)).unwrap();
        assert_eq!(native(&paths, payer), Amount::from_coins(100));
        assert_eq!(native(&paths, recipient), Amount::ZERO);

        with_ledger(&paths, |db, _| rollback(db)).unwrap();
        assert_eq!(native(&paths, payer), Amount::ZERO);
        assert!(with_ledger(&paths, |db, _| rollback(db)).is_err());
    }

    #[test]
    fn repeated_allocation_leaves_ledger_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LedgerPaths {
            config: None,
            data_dir: Some(dir.path().join("ledger")),
        };
        let payer = address("payer");
        let repeated = cli::InitArgs {
            allocations: vec![(payer, Amount::from_coins(100)), (payer, Amount::from_coins(100))],
        };

        assert!(with_ledger(&paths, |db, config| init_ledger(db, config, repeated)).is_err());
        assert_eq!(native(&paths, payer), Amount::ZERO);

        let single = cli::InitArgs {
            allocations: vec![(payer, Amount::from_coins(100))],
        };
        with_ledger(&paths, |db, config| init_ledger(db, config, single)).unwrap();
        assert_eq!(native(&paths, payer), Amount::from_coins(100));
    }

    #[test]
    fn config_file_sets_the_ledger_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("ledger.toml");
        std::fs::write(&config_path, "data_dir = \"/srv/namechain\"\n").unwrap();

        let from_file = LedgerPaths {
            config: Some(config_path.clone()),
            data_dir: None,
        };
        assert_eq!(from_file.resolve().unwrap().data_dir, PathBuf::from("/srv/namechain"));

        let overridden = LedgerPaths {
            config: Some(config_path),
            data_dir: Some(dir.path().to_path_buf()),
        };
        assert_eq!(overridden.resolve().unwrap().data_dir, dir.path());
    }

    #[test]
    fn garbage_hex_is_rejected() {
        assert!(decode("not hex").is_err());
        assert!(decode("00ff").is_err());
    }
}
