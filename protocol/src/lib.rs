// Copyright (c) 2026 Namechain Developers. MIT License.
// See LICENSE for details.

//! # Namechain Protocol: Core Library
//!
//! The transaction engine of a name-registry ledger: accounts holding a
//! native coin and user-issued assets, a registry of names that can be sold
//! and bought, polls, and an order book for asset exchange.
//!
//! Every state change is a signed [`transaction::Transaction`]. Each one can
//! be validated against a ledger, processed into it, and orphaned out of it
//! again, leaving the ledger byte-for-byte as it was.
//!
//! ## Modules
//!
//! - **crypto**: Ed25519 keys and signatures, SHA-2 and BLAKE3 digests.
//! - **account**: Addresses and account queries.
//! - **naming**: Name records and name sales.
//! - **assets**: Assets, orders, trades and the matching arithmetic.
//! - **voting**: Polls and their options.
//! - **transaction**: The wire format and every transaction type.
//! - **storage**: The sled-backed ledger and the block pipeline.
//! - **clock**: Time sources for timestamps.
//! - **config**: Protocol constants and ledger configuration.

pub mod account;
pub mod assets;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod naming;
pub mod storage;
pub mod transaction;
pub mod voting;
