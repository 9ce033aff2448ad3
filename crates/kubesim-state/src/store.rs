//! ResourceStore — redb-backed collection persistence for kubesim.
//!
//! Each collection is a JSON array serialized into one value of the
//! `collections` table. The store supports both on-disk and in-memory
//! backends; the daemon picks on-disk when a cache directory is configured.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde_json::Value;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::COLLECTIONS;

/// Convert any `Display` error into a `StateError` variant via a closure
/// factory. The two-argument form records the collection involved.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
    ($variant:ident, $collection:expr) => {
        |e| StateError::$variant {
            collection: $collection.to_string(),
            reason: e.to_string(),
        }
    };
}

/// Location reported for the in-memory backend.
const IN_MEMORY: &str = "<in-memory>";

/// Thread-safe resource store backed by redb.
#[derive(Clone)]
pub struct ResourceStore {
    db: Arc<Database>,
}

impl ResourceStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(|e| StateError::Open {
            location: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "resource store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(|e| StateError::Open {
                location: IN_MEMORY.to_string(),
                reason: e.to_string(),
            })?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory resource store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Read a whole collection. Missing collections read as empty.
    pub fn get(&self, key: &str) -> StateResult<Vec<Value>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read, key))? {
            Some(guard) => {
                let objects: Vec<Value> =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Corrupt, key))?;
                Ok(objects)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Replace a whole collection.
    pub fn set(&self, key: &str, objects: &[Value]) -> StateResult<()> {
        let value = serde_json::to_vec(objects).map_err(map_err!(Encode, key))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write, key))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, count = objects.len(), "collection stored");
        Ok(())
    }

    /// Drop a collection. Returns true if it existed.
    pub fn clear(&self, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write, key))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "collection cleared");
        Ok(existed)
    }

    /// Keys of every stored collection, in key order.
    pub fn keys(&self) -> StateResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(map_err!(Scan))? {
            let (key, _) = entry.map_err(map_err!(Scan))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}
