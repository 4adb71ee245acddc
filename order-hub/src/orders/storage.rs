//! redb-based order store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Canonical records |
//! | `orders_by_created` | `(created_at, order_id)` | `()` | Age ordering for listing and archival selection |
//!
//! # Durability
//!
//! redb commits are durable once `commit()` returns (copy-on-write with an
//! atomic pointer swap), so the archival pipeline can rely on a successful
//! `delete_orders` meaning the records are gone.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for order records: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Secondary index: key = (created_at, order_id), value = empty
const CREATED_INDEX_TABLE: TableDefinition<(i64, &str), ()> =
    TableDefinition::new("orders_by_created");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order already exists: {0}")]
    DuplicateOrder(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, ephemeral hubs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(CREATED_INDEX_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    // ========== Writes ==========

    /// Insert a new order; fails if the id is taken
    pub fn insert_order(&self, order: &Order) -> StorageResult<()> {
        let bytes = serde_json::to_vec(order)?;
        let txn = self.db.begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            if orders.get(order.order_id.as_str())?.is_some() {
                return Err(StorageError::DuplicateOrder(order.order_id.clone()));
            }
            orders.insert(order.order_id.as_str(), bytes.as_slice())?;

            let mut index = txn.open_table(CREATED_INDEX_TABLE)?;
            index.insert((order.created_at, order.order_id.as_str()), ())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Overwrite an existing order (last write wins)
    ///
    /// `created_at` is immutable, so the age index is untouched.
    pub fn update_order(&self, order: &Order) -> StorageResult<()> {
        let bytes = serde_json::to_vec(order)?;
        let txn = self.db.begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            if orders.get(order.order_id.as_str())?.is_none() {
                return Err(StorageError::OrderNotFound(order.order_id.clone()));
            }
            orders.insert(order.order_id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Delete orders by id in a single transaction; returns how many existed
    pub fn delete_orders(&self, order_ids: &[String]) -> StorageResult<usize> {
        let txn = self.db.begin_write()?;
        let mut deleted = 0;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let mut index = txn.open_table(CREATED_INDEX_TABLE)?;
            for id in order_ids {
                let removed = orders.remove(id.as_str())?;
                if let Some(guard) = removed {
                    let order: Order = serde_json::from_slice(guard.value())?;
                    drop(guard);
                    index.remove((order.created_at, order.order_id.as_str()))?;
                    deleted += 1;
                }
            }
        }
        txn.commit()?;
        Ok(deleted)
    }

    // ========== Reads ==========

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All orders, newest `created_at` first
    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CREATED_INDEX_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::with_capacity(index.len()? as usize);
        for entry in index.iter()?.rev() {
            let (key, _) = entry?;
            let (_, order_id) = key.value();
            if let Some(guard) = orders.get(order_id)? {
                result.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(result)
    }

    /// Orders with `created_at < cutoff`, oldest first
    pub fn select_created_before(&self, cutoff: i64) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CREATED_INDEX_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((i64::MIN, "")..(cutoff, ""))? {
            let (key, _) = entry?;
            let (_, order_id) = key.value();
            if let Some(guard) = orders.get(order_id)? {
                result.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(result)
    }

    pub fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }
}
