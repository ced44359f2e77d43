//! # Key-Value Backends
//!
//! Every sub-store of the ledger is a flat, ordered key-value space behind
//! the [`Backend`] trait. Two implementations exist:
//!
//! - `sled::Tree` for the root ledger, temporary or on disk.
//! - [`Overlay`] for forks: writes are buffered in memory and reads fall
//!   through to the parent until [`Overlay::drain_into_parent`] publishes them.
//!
//! Overlays stack. A fork of a fork drains into the inner overlay, which in
//! turn drains into sled when its own ledger commits.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use super::db::{DbError, DbResult};

/// Ordered byte-keyed storage. Interior mutability: writes take `&self`.
pub trait Backend: Send + Sync {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    fn insert(&self, key: &[u8], value: Vec<u8>) -> DbResult<()>;

    fn remove(&self, key: &[u8]) -> DbResult<()>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

impl Backend for sled::Tree {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(sled::Tree::get(self, key)?.map(|v| v.to_vec()))
    }

    fn insert(&self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        sled::Tree::insert(self, key, value)?;
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> DbResult<()> {
        sled::Tree::remove(self, key)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        sled::Tree::scan_prefix(self, prefix)
            .map(|entry| {
                entry
                    .map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(DbError::from)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

/// A write buffer over a parent backend. `None` marks a deletion.
pub struct Overlay {
    parent: Arc<dyn Backend>,
    writes: RwLock<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl Overlay {
    pub fn new(parent: Arc<dyn Backend>) -> Self {
        Self {
            parent,
            writes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of buffered writes (inserts and deletions).
    pub fn pending(&self) -> usize {
        self.writes.read().len()
    }

    /// Publish every buffered write to the parent and clear the buffer.
    pub fn drain_into_parent(&self) -> DbResult<()> {
        let writes = std::mem::take(&mut *self.writes.write());
        for (key, value) in writes {
            match value {
                Some(value) => self.parent.insert(&key, value)?,
                None => self.parent.remove(&key)?,
            }
        }
        Ok(())
    }
}

impl Backend for Overlay {
    fn get(&self, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.read().get(key) {
            return Ok(buffered.clone());
        }
        self.parent.get(key)
    }

    fn insert(&self, key: &[u8], value: Vec<u8>) -> DbResult<()> {
        self.writes.write().insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> DbResult<()> {
        self.writes.write().insert(key.to_vec(), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.scan_prefix(prefix)?.into_iter().collect();
        let writes = self.writes.read();
        let range = writes.range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded));
        for (key, value) in range.take_while(|(k, _)| k.starts_with(prefix)) {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_tree() -> Arc<dyn Backend> {
        let db = sled::Config::new().temporary(true).open().unwrap();
        Arc::new(db.open_tree("t").unwrap())
    }

    #[test]
    fn overlay_reads_through_and_shadows() {
        let parent = temp_tree();
        parent.insert(b"a", b"1".to_vec()).unwrap();
        parent.insert(b"b", b"2".to_vec()).unwrap();

        let overlay = Overlay::new(parent.clone());
        assert_eq!(overlay.get(b"a").unwrap(), Some(b"1".to_vec()));

        overlay.insert(b"a", b"9".to_vec()).unwrap();
        overlay.remove(b"b").unwrap();
        assert_eq!(overlay.get(b"a").unwrap(), Some(b"9".to_vec()));
        assert_eq!(overlay.get(b"b").unwrap(), None);

        // Parent untouched until drained.
        assert_eq!(parent.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(parent.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn drain_publishes_writes() {
        let parent = temp_tree();
        parent.insert(b"gone", b"x".to_vec()).unwrap();
        let overlay = Overlay::new(parent.clone());
        overlay.insert(b"new", b"y".to_vec()).unwrap();
        overlay.remove(b"gone").unwrap();
        assert_eq!(overlay.pending(), 2);

        overlay.drain_into_parent().unwrap();
        assert_eq!(overlay.pending(), 0);
        assert_eq!(parent.get(b"new").unwrap(), Some(b"y".to_vec()));
        assert_eq!(parent.get(b"gone").unwrap(), None);
    }

    #[test]
    fn scan_prefix_merges_in_order() {
        let parent = temp_tree();
        parent.insert(b"p1", b"a".to_vec()).unwrap();
        parent.insert(b"p3", b"c".to_vec()).unwrap();
        parent.insert(b"q1", b"z".to_vec()).unwrap();

        let overlay = Overlay::new(parent);
        overlay.insert(b"p2", b"b".to_vec()).unwrap();
        overlay.remove(b"p3").unwrap();
        overlay.insert(b"q0", b"y".to_vec()).unwrap();

        let keys: Vec<Vec<u8>> = overlay
            .scan_prefix(b"p")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"p1".to_vec(), b"p2".to_vec()]);
    }

    #[test]
    fn nested_overlays() {
        let parent = temp_tree();
        let outer: Arc<Overlay> = Arc::new(Overlay::new(parent.clone()));
        let inner = Overlay::new(outer.clone());
        inner.insert(b"k", b"v".to_vec()).unwrap();

        inner.drain_into_parent().unwrap();
        assert_eq!(outer.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(parent.get(b"k").unwrap(), None);

        outer.drain_into_parent().unwrap();
        assert_eq!(parent.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
