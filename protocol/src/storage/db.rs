//! # DatabaseSet: the Ledger Store
//!
//! The aggregate of every sub-store the transaction engine reads and writes,
//! built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree               | Key                                   | Value                    |
//! |--------------------|---------------------------------------|--------------------------|
//! | `balances`         | `address (25) ‖ asset (8B BE)`        | `amount` (8B BE)         |
//! | `references`       | `address (25)`                        | `signature` (64)         |
//! | `names`            | name (UTF-8)                          | `bincode(Name)`          |
//! | `name_sales`       | name (UTF-8)                          | `bincode(NameSale)`      |
//! | `assets`           | `asset key (8B BE)`                   | `bincode(Asset)`         |
//! | `orders`           | `order id (64)`                       | `bincode(Order)`         |
//! | `order_book`       | `have ‖ want ‖ price ‖ timestamp ‖ id`| empty                    |
//! | `completed_orders` | `order id (64)`                       | `bincode(Order)`         |
//! | `trades`           | `initiator (64) ‖ target (64)`        | `bincode(Trade)`         |
//! | `polls`            | poll name (UTF-8)                     | `bincode(Poll)`          |
//! | `blocks`           | `height (8B BE)`                      | `bincode(BlockRecord)`   |
//! | `block_index`      | `block signature (32)`                | `height (8B BE)`         |
//! | `transactions`     | `signature (64)`                      | raw wire bytes           |
//! | `undo`             | `signature (64)`                      | `bincode(UndoRecord)`    |
//! | `metadata`         | key (UTF-8)                           | value (bytes)            |
//!
//! Integers in keys are big-endian so that sled's lexicographic ordering
//! matches numeric ordering.
//!
//! ## Forks
//!
//! [`DatabaseSet::fork`] returns a ledger whose trees are [`Overlay`]s over
//! this one. The fork sees every write of its parent and buffers its own;
//! [`DatabaseSet::commit`] on the fork publishes them, dropping the fork
//! discards them. The parent must not be written while a fork of it is alive.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::backend::{Backend, Overlay};
use crate::config::{FeePolicy, LedgerConfig};
use crate::crypto::hash::blake3_hash_multi;
use crate::crypto::merkle_root;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record in {tree}: {detail}")]
    Corrupt { tree: &'static str, detail: String },
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// The sub-stores of a ledger, in state-root order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Table {
    Balances,
    References,
    Names,
    NameSales,
    Assets,
    Orders,
    OrderBook,
    CompletedOrders,
    Trades,
    Polls,
    Blocks,
    BlockIndex,
    Transactions,
    Undo,
    Metadata,
}

impl Table {
    pub(crate) const ALL: [Table; 15] = [
        Table::Balances,
        Table::References,
        Table::Names,
        Table::NameSales,
        Table::Assets,
        Table::Orders,
        Table::OrderBook,
        Table::CompletedOrders,
        Table::Trades,
        Table::Polls,
        Table::Blocks,
        Table::BlockIndex,
        Table::Transactions,
        Table::Undo,
        Table::Metadata,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Table::Balances => "balances",
            Table::References => "references",
            Table::Names => "names",
            Table::NameSales => "name_sales",
            Table::Assets => "assets",
            Table::Orders => "orders",
            Table::OrderBook => "order_book",
            Table::CompletedOrders => "completed_orders",
            Table::Trades => "trades",
            Table::Polls => "polls",
            Table::Blocks => "blocks",
            Table::BlockIndex => "block_index",
            Table::Transactions => "transactions",
            Table::Undo => "undo",
            Table::Metadata => "metadata",
        }
    }
}

// ---------------------------------------------------------------------------
// DatabaseSet
// ---------------------------------------------------------------------------

/// The ledger: every sub-store plus the fee routing policy.
///
/// Reads take `&self`, writes take `&mut self`. One writer per ledger.
pub struct DatabaseSet {
    /// Present on a root ledger, absent on forks.
    db: Option<sled::Db>,
    /// One backend per [`Table`], indexed by discriminant.
    tables: Vec<Arc<dyn Backend>>,
    /// The overlays backing `tables` when this ledger is a fork.
    overlays: Vec<Arc<Overlay>>,
    fee_policy: FeePolicy,
    path: Option<PathBuf>,
}

impl fmt::Debug for DatabaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSet")
            .field("fork", &self.is_fork())
            .field("path", &self.path)
            .field("fee_policy", &self.fee_policy)
            .finish()
    }
}

impl DatabaseSet {
    /// An empty ledger in a temporary sled database, removed on drop.
    ///
    /// Ideal for tests: no filesystem side effects, no cleanup needed.
    pub fn create_empty() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, FeePolicy::default(), None)
    }

    /// Open (or create) a persistent ledger at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: &LedgerConfig) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)?;
        info!(path = %path.display(), "ledger opened");
        Self::from_db(db, config.fee_policy.clone(), Some(path))
    }

    fn from_db(db: sled::Db, fee_policy: FeePolicy, path: Option<PathBuf>) -> DbResult<Self> {
        let mut tables: Vec<Arc<dyn Backend>> = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            tables.push(Arc::new(db.open_tree(table.name())?));
        }
        Ok(Self {
            db: Some(db),
            tables,
            overlays: Vec::new(),
            fee_policy,
            path,
        })
    }

    /// Replace the fee routing policy.
    pub fn with_fee_policy(mut self, fee_policy: FeePolicy) -> Self {
        self.fee_policy = fee_policy;
        self
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fee_policy
    }

    pub fn is_fork(&self) -> bool {
        self.db.is_none()
    }

    /// A ledger that reads through to this one and buffers its own writes.
    pub fn fork(&self) -> DatabaseSet {
        let overlays: Vec<Arc<Overlay>> = self
            .tables
            .iter()
            .map(|parent| Arc::new(Overlay::new(parent.clone())))
            .collect();
        let tables = overlays
            .iter()
            .map(|overlay| overlay.clone() as Arc<dyn Backend>)
            .collect();
        DatabaseSet {
            db: None,
            tables,
            overlays,
            fee_policy: self.fee_policy.clone(),
            path: None,
        }
    }

    /// Make pending writes durable.
    ///
    /// A fork publishes its buffered writes to its parent and stays usable.
    /// A root ledger flushes sled to disk.
    pub fn commit(&mut self) -> DbResult<()> {
        match &self.db {
            Some(db) => {
                db.flush()?;
                debug!("ledger flushed");
            }
            None => {
                let pending: usize = self.overlays.iter().map(|o| o.pending()).sum();
                for overlay in &self.overlays {
                    overlay.drain_into_parent()?;
                }
                debug!(writes = pending, "fork committed");
            }
        }
        Ok(())
    }

    /// Flush and release the ledger. Uncommitted fork writes are discarded.
    pub fn close(self) -> DbResult<()> {
        if let Some(db) = &self.db {
            db.flush()?;
            info!(path = ?self.path, "ledger closed");
        }
        Ok(())
    }

    /// Digest of the complete ledger contents.
    ///
    /// Each tree hashes to a BLAKE3 Merkle root over its sorted entries; the
    /// ledger root is the Merkle root of the tree roots. Two ledgers with
    /// equal contents have equal roots regardless of write history.
    pub fn state_root(&self) -> DbResult<[u8; 32]> {
        let mut roots = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let leaves: Vec<[u8; 32]> = self
                .backend(table)
                .scan_prefix(&[])?
                .iter()
                .map(|(key, value)| {
                    let len = (key.len() as u32).to_be_bytes();
                    blake3_hash_multi(&[&len[..], key.as_slice(), value.as_slice()])
                })
                .collect();
            let root = merkle_root(&leaves);
            roots.push(blake3_hash_multi(&[table.name().as_bytes(), &root[..]]));
        }
        Ok(merkle_root(&roots))
    }

    /// Hex form of [`state_root`](Self::state_root).
    pub fn state_root_hex(&self) -> DbResult<String> {
        Ok(hex::encode(self.state_root()?))
    }

    // -- Raw access -----------------------------------------------------------

    fn backend(&self, table: Table) -> &Arc<dyn Backend> {
        &self.tables[table as usize]
    }

    pub(crate) fn get_raw(&self, table: Table, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.backend(table).get(key)
    }

    pub(crate) fn put_raw(&mut self, table: Table, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        self.backend(table).insert(key, value)
    }

    pub(crate) fn delete(&mut self, table: Table, key: &[u8]) -> DbResult<()> {
        self.backend(table).remove(key)
    }

    pub(crate) fn scan_raw(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.backend(table).scan_prefix(prefix)
    }

    // -- Typed access ---------------------------------------------------------

    pub(crate) fn get_value<T: DeserializeOwned>(
        &self,
        table: Table,
        key: &[u8],
    ) -> DbResult<Option<T>> {
        match self.get_raw(table, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put_value<T: Serialize>(
        &mut self,
        table: Table,
        key: &[u8],
        value: &T,
    ) -> DbResult<()> {
        let bytes = encode(value)?;
        self.put_raw(table, key, bytes)
    }

    pub(crate) fn scan_values<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> DbResult<Vec<(Vec<u8>, T)>> {
        self.scan_raw(table, prefix)?
            .into_iter()
            .map(|(key, bytes)| Ok((key, decode(&bytes)?)))
            .collect()
    }

    pub(crate) fn get_u64(&self, table: Table, key: &[u8]) -> DbResult<Option<u64>> {
        match self.get_raw(table, key)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| DbError::Corrupt {
                    tree: table.name(),
                    detail: format!("expected 8-byte integer, got {} bytes", bytes.len()),
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn put_u64(&mut self, table: Table, key: &[u8], value: u64) -> DbResult<()> {
        self.put_raw(table, key, value.to_be_bytes().to_vec())
    }
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
