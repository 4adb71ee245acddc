//! 归档目标
//!
//! Archive rows are row-oriented with a fixed 16-column layout. Row 0 of a
//! target holds the header and is written the first time the target is used.
//!
//! | # | Column | Source |
//! |---|--------|--------|
//! | 0 | Order ID | `order_id` |
//! | 1 | Customer Name | `customer.name` |
//! | 2 | Phone | `customer.phone` |
//! | 3 | Address | `customer.address` |
//! | 4 | Items | `items` as JSON |
//! | 5 | Total | `total` |
//! | 6 | Status | `status` |
//! | 7 | Order Type | `order_type` |
//! | 8 | Payment Method | `payment_method` |
//! | 9 | Created At | RFC 3339 |
//! | 10 | Updated At | RFC 3339 |
//! | 11 | Delivered At | RFC 3339 or empty |
//! | 12 | Driver Name | `assigned_driver` or empty |
//! | 13 | Driver ID | `assigned_driver_id` or empty |
//! | 14 | Notes | `customer.notes` or empty |
//! | 15 | Archived At | RFC 3339, run timestamp |

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableHandle};
use shared::order::Order;
use shared::util::millis_to_rfc3339;
use thiserror::Error;

pub const ARCHIVE_COLUMNS: [&str; 16] = [
    "Order ID",
    "Customer Name",
    "Phone",
    "Address",
    "Items",
    "Total",
    "Status",
    "Order Type",
    "Payment Method",
    "Created At",
    "Updated At",
    "Delivered At",
    "Driver Name",
    "Driver ID",
    "Notes",
    "Archived At",
];

/// Archive errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Archive transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Archive table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Archive storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Archive commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive target unavailable: {0}")]
    Unavailable(String),

    #[error("Header mismatch on target {0}")]
    HeaderMismatch(String),
}

/// One archived order, cells in [`ARCHIVE_COLUMNS`] order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRow {
    pub order_id: String,
    cells: Vec<String>,
}

impl ArchiveRow {
    pub fn from_order(order: &Order, archived_at: i64) -> Result<Self, ArchiveError> {
        let opt_time = |t: Option<i64>| t.map(millis_to_rfc3339).unwrap_or_default();
        let cells = vec![
            order.order_id.clone(),
            order.customer.name.clone(),
            order.customer.phone.clone(),
            order.customer.address.clone(),
            serde_json::to_string(&order.items)?,
            format!("{:.2}", order.total),
            order.status.to_string(),
            order.order_type.to_string(),
            order.payment_method.clone(),
            millis_to_rfc3339(order.created_at),
            millis_to_rfc3339(order.updated_at),
            opt_time(order.delivered_at),
            order.assigned_driver.clone().unwrap_or_default(),
            order.assigned_driver_id.clone().unwrap_or_default(),
            order.customer.notes.clone().unwrap_or_default(),
            millis_to_rfc3339(archived_at),
        ];
        Ok(Self {
            order_id: order.order_id.clone(),
            cells,
        })
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Cell by column name
    pub fn get(&self, column: &str) -> Option<&str> {
        ARCHIVE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
    }
}

/// 归档写入目标
///
/// `append_rows` must only return `Ok(n)` once all `n` rows are durable, and
/// must create the header row if the target does not have one yet.
#[async_trait]
pub trait ArchiveSink: Send + Sync + std::fmt::Debug {
    async fn append_rows(&self, target: &str, rows: &[ArchiveRow]) -> Result<usize, ArchiveError>;
}

/// redb 行簿：每个目标一张表，key 为行号
///
/// Rows are stored as JSON string arrays. One append is one transaction.
#[derive(Clone)]
pub struct RedbArchiveBook {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbArchiveBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbArchiveBook").finish_non_exhaustive()
    }
}

fn sheet(target: &str) -> TableDefinition<'_, u64, &'static [u8]> {
    TableDefinition::new(target)
}

impl RedbArchiveBook {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let db = Database::create(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn open_in_memory() -> Result<Self, ArchiveError> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Ok(Self { db: Arc::new(db) })
    }

    fn append_blocking(&self, target: &str, rows: &[ArchiveRow]) -> Result<usize, ArchiveError> {
        if target.trim().is_empty() {
            return Err(ArchiveError::Unavailable("empty target name".to_string()));
        }
        let header = serde_json::to_vec(&ARCHIVE_COLUMNS)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(sheet(target))?;
            let existing = table.get(0u64)?.map(|guard| guard.value().to_vec());
            match existing {
                None => {
                    table.insert(0u64, header.as_slice())?;
                }
                Some(existing) if existing != header => {
                    return Err(ArchiveError::HeaderMismatch(target.to_string()));
                }
                Some(_) => {}
            }

            let mut next = match table.last()? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            for row in rows {
                let bytes = serde_json::to_vec(row.cells())?;
                table.insert(next, bytes.as_slice())?;
                next += 1;
            }
        }
        txn.commit()?;
        Ok(rows.len())
    }

    /// All rows of a target including the header (empty if the target does not exist)
    pub fn rows(&self, target: &str) -> Result<Vec<Vec<String>>, ArchiveError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(sheet(target)) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            result.push(serde_json::from_slice(value.value())?);
        }
        Ok(result)
    }

    /// Names of all targets in the book
    pub fn targets(&self) -> Result<Vec<String>, ArchiveError> {
        let read_txn = self.db.begin_read()?;
        Ok(read_txn
            .list_tables()?
            .map(|t| t.name().to_string())
            .collect())
    }
}

#[async_trait]
impl ArchiveSink for RedbArchiveBook {
    async fn append_rows(&self, target: &str, rows: &[ArchiveRow]) -> Result<usize, ArchiveError> {
        self.append_blocking(target, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{Customer, OrderItem, OrderStatus, OrderType};

    fn order() -> Order {
        Order {
            order_id: "ORD-7".to_string(),
            customer: Customer {
                name: "Ana".to_string(),
                phone: "600".to_string(),
                address: "Calle 1".to_string(),
                email: None,
                notes: Some("timbre roto".to_string()),
            },
            items: vec![OrderItem {
                name: "Pizza".to_string(),
                quantity: 1,
                unit_price: 10.0,
                total_price: 10.0,
                size: None,
                supplements: vec![],
            }],
            total: 10.0,
            status: OrderStatus::Delivered,
            order_type: OrderType::Delivery,
            payment_method: "cash".to_string(),
            assigned_driver_id: Some("D1".to_string()),
            assigned_driver: Some("Marta".to_string()),
            created_at: 0,
            updated_at: 1_000,
            delivered_at: Some(1_000),
            assigned_at: Some(500),
            cancel_reason: None,
        }
    }

    #[test]
    fn test_row_layout() {
        let row = ArchiveRow::from_order(&order(), 86_400_000).unwrap();
        assert_eq!(row.cells().len(), ARCHIVE_COLUMNS.len());
        assert_eq!(row.get("Order ID"), Some("ORD-7"));
        assert_eq!(row.get("Total"), Some("10.00"));
        assert_eq!(row.get("Status"), Some("delivered"));
        assert_eq!(row.get("Created At"), Some("1970-01-01T00:00:00.000Z"));
        assert_eq!(row.get("Driver Name"), Some("Marta"));
        assert_eq!(row.get("Notes"), Some("timbre roto"));
        assert_eq!(row.get("Archived At"), Some("1970-01-02T00:00:00.000Z"));

        let items: serde_json::Value = serde_json::from_str(row.get("Items").unwrap()).unwrap();
        assert_eq!(items[0]["name"], "Pizza");
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let book = RedbArchiveBook::open_in_memory().unwrap();
        let row = ArchiveRow::from_order(&order(), 0).unwrap();

        assert_eq!(book.append_rows("Archived Orders", &[row.clone()]).await.unwrap(), 1);
        assert_eq!(book.append_rows("Archived Orders", &[row]).await.unwrap(), 1);

        let rows = book.rows("Archived Orders").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ARCHIVE_COLUMNS.map(String::from).to_vec());
        assert_eq!(rows[1][0], "ORD-7");
        assert_eq!(book.targets().unwrap(), vec!["Archived Orders".to_string()]);
    }

    #[test]
    fn test_missing_target_reads_empty() {
        let book = RedbArchiveBook::open_in_memory().unwrap();
        assert!(book.rows("nothing here").unwrap().is_empty());
    }
}
