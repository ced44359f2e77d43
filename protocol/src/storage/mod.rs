//! # Storage Module
//!
//! Persistent ledger state on sled.
//!
//! ```text
//! backend.rs  sled trees and in-memory fork overlays behind one trait
//! db.rs       DatabaseSet: trees, forks, commit, state root
//! maps.rs     typed accessors (balances, names, orders, blocks, ...)
//! block.rs    BlockRecord and its BLAKE3 signature
//! chain.rs    apply_block / orphan_block
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! [Transaction] → apply_block → fork → process → commit → DatabaseSet
//!                                                            ↓
//!                                                          sled
//! ```
//!
//! Values are bincode, integers in keys are big-endian.

mod backend;
pub mod block;
pub mod chain;
pub mod db;
mod maps;

pub use block::BlockRecord;
pub use chain::{apply_block, block_transactions, orphan_block, BlockError};
pub use db::{DatabaseSet, DbError, DbResult};
