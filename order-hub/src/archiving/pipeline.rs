//! 归档流水线
//!
//! ```text
//! run_at(now)
//!     ├─ 1. Acquire run guard (busy → AlreadyRunning)
//!     ├─ 2. Select orders with created_at < now - retention (oldest first)
//!     ├─ 3. Build archive rows (Archived At = now)
//!     ├─ 4. Append to sink, wait for acknowledgement of every row
//!     ├─ 5. Delete the acknowledged orders
//!     └─ 6. Report { archived, deleted }
//! ```
//!
//! Nothing is deleted unless step 4 acknowledged every row. If step 5 fails
//! after a successful append, the orders stay in the store and a rerun
//! appends them again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use shared::response::CleanupReport;
use shared::util::{millis_to_rfc3339, now_millis};
use thiserror::Error;

use super::sink::{ArchiveError, ArchiveRow, ArchiveSink};
use crate::orders::{ManagerError, OrdersManager};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cleanup already running")]
    AlreadyRunning,

    #[error("Failed to select orders: {0}")]
    Select(ManagerError),

    #[error("Archive write failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Archive acknowledged {acked} of {expected} rows")]
    IncompleteAck { expected: usize, acked: usize },

    #[error("Delete failed after archiving {archived} orders: {source}")]
    Delete {
        archived: usize,
        #[source]
        source: ManagerError,
    },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::AlreadyRunning => "CLEANUP_IN_PROGRESS",
            PipelineError::Select(_) => "SELECT_FAILED",
            PipelineError::Archive(_) | PipelineError::IncompleteAck { .. } => "ARCHIVE_FAILED",
            PipelineError::Delete { .. } => "DELETE_FAILED",
        }
    }

    /// Rows already durable in the archive when the run failed
    pub fn archived(&self) -> usize {
        match self {
            PipelineError::Delete { archived, .. } => *archived,
            _ => 0,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    pub archived: usize,
    pub deleted: usize,
    /// Run timestamp (Unix millis), also the `Archived At` of every row
    pub ran_at: i64,
}

/// 归档流水线
#[derive(Debug)]
pub struct ArchivePipeline {
    manager: Arc<OrdersManager>,
    sink: Arc<dyn ArchiveSink>,
    target: String,
    retention: Duration,
    running: AtomicBool,
}

/// Clears the running flag when the run ends (including on panic)
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ArchivePipeline {
    pub fn new(
        manager: Arc<OrdersManager>,
        sink: Arc<dyn ArchiveSink>,
        target: impl Into<String>,
        retention: Duration,
    ) -> Self {
        Self {
            manager,
            sink,
            target: target.into(),
            retention,
            running: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn run(&self) -> Result<CleanupSummary, PipelineError> {
        self.run_at(now_millis()).await
    }

    /// Run with an explicit clock (`now` in Unix millis)
    pub async fn run_at(&self, now: i64) -> Result<CleanupSummary, PipelineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PipelineError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let cutoff = now.saturating_sub(self.retention.as_millis() as i64);
        let selected = self
            .manager
            .select_older_than(cutoff)
            .map_err(PipelineError::Select)?;

        if selected.is_empty() {
            tracing::debug!(cutoff = %millis_to_rfc3339(cutoff), "No orders to archive");
            return Ok(CleanupSummary {
                archived: 0,
                deleted: 0,
                ran_at: now,
            });
        }

        let rows = selected
            .iter()
            .map(|order| ArchiveRow::from_order(order, now))
            .collect::<Result<Vec<_>, _>>()?;

        let acked = match self.sink.append_rows(&self.target, &rows).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(
                    target_sheet = %self.target,
                    selected = rows.len(),
                    error = %e,
                    "Archive write failed, no orders deleted"
                );
                return Err(e.into());
            }
        };
        if acked != rows.len() {
            tracing::error!(
                expected = rows.len(),
                acked,
                "Archive acknowledged a partial write, no orders deleted"
            );
            return Err(PipelineError::IncompleteAck {
                expected: rows.len(),
                acked,
            });
        }

        let deleted = match self.manager.delete_archived(&selected) {
            Ok(ids) => ids,
            Err(source) => {
                tracing::error!(
                    archived = acked,
                    error = %source,
                    "Delete failed after archiving; orders remain and will be re-archived"
                );
                return Err(PipelineError::Delete {
                    archived: acked,
                    source,
                });
            }
        };

        tracing::info!(
            archived = acked,
            deleted = deleted.len(),
            order_ids = ?deleted,
            "Cleanup completed"
        );
        Ok(CleanupSummary {
            archived: acked,
            deleted: deleted.len(),
            ran_at: now,
        })
    }
}

/// Run outcome → wire report
pub fn to_report(result: &Result<CleanupSummary, PipelineError>, now: i64) -> CleanupReport {
    match result {
        Ok(summary) => CleanupReport::completed(
            summary.archived,
            summary.deleted,
            millis_to_rfc3339(summary.ran_at),
        ),
        Err(e) => {
            let mut report = CleanupReport::failed(e.code(), e.to_string(), millis_to_rfc3339(now));
            report.archived = e.archived();
            report
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiving::sink::RedbArchiveBook;
    use crate::message::Broadcaster;
    use crate::orders::OrderStorage;
    use async_trait::async_trait;
    use shared::order::{Customer, OrderType};
    use shared::request::{CreateOrderRequest, OrderItemInput};
    use tokio::sync::Notify;

    const HOUR_MS: i64 = 3_600_000;

    fn manager() -> Arc<OrdersManager> {
        let broadcaster = Broadcaster::new(16);
        broadcaster.start().unwrap();
        Arc::new(OrdersManager::new(
            OrderStorage::open_in_memory().unwrap(),
            broadcaster,
        ))
    }

    fn create(m: &OrdersManager, id: &str) -> shared::order::Order {
        m.create_order(CreateOrderRequest {
            order_id: Some(id.to_string()),
            customer: Customer {
                name: "Ana".to_string(),
                phone: "600".to_string(),
                address: "Calle 1".to_string(),
                email: None,
                notes: None,
            },
            items: vec![OrderItemInput {
                name: "Menu".to_string(),
                quantity: 1,
                unit_price: 12.0,
                size: None,
                supplements: vec![],
            }],
            order_type: OrderType::Pickup,
            payment_method: "cash".to_string(),
        })
        .unwrap()
    }

    fn pipeline(m: Arc<OrdersManager>, sink: Arc<dyn ArchiveSink>) -> ArchivePipeline {
        ArchivePipeline::new(m, sink, "Archived Orders", Duration::from_secs(24 * 3600))
    }

    #[derive(Debug)]
    struct ShortAck;

    #[async_trait]
    impl ArchiveSink for ShortAck {
        async fn append_rows(&self, _: &str, rows: &[ArchiveRow]) -> Result<usize, ArchiveError> {
            Ok(rows.len().saturating_sub(1))
        }
    }

    /// Blocks inside append until released
    #[derive(Debug, Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ArchiveSink for Gate {
        async fn append_rows(&self, _: &str, rows: &[ArchiveRow]) -> Result<usize, ArchiveError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(rows.len())
        }
    }

    #[tokio::test]
    async fn test_young_orders_are_kept() {
        let m = manager();
        let order = create(&m, "A");
        let book = Arc::new(RedbArchiveBook::open_in_memory().unwrap());
        let p = pipeline(m.clone(), book.clone());

        let summary = p.run_at(order.created_at + 23 * HOUR_MS).await.unwrap();
        assert_eq!((summary.archived, summary.deleted), (0, 0));
        assert_eq!(m.order_count().unwrap(), 1);
        assert!(book.rows("Archived Orders").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_ack_deletes_nothing() {
        let m = manager();
        let order = create(&m, "A");
        create(&m, "B");
        let p = pipeline(m.clone(), Arc::new(ShortAck));

        let result = p.run_at(order.created_at + 25 * HOUR_MS).await;
        assert!(matches!(
            result,
            Err(PipelineError::IncompleteAck {
                expected: 2,
                acked: 1
            })
        ));
        assert_eq!(m.order_count().unwrap(), 2);

        let report = to_report(&result, 0);
        assert!(!report.success);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.error.as_deref(), Some("ARCHIVE_FAILED"));
    }

    #[tokio::test]
    async fn test_overlapping_run_is_rejected() {
        let m = manager();
        let order = create(&m, "A");
        let gate = Arc::new(Gate::default());
        let p = Arc::new(pipeline(m.clone(), gate.clone()));
        let now = order.created_at + 25 * HOUR_MS;

        let first = {
            let p = p.clone();
            tokio::spawn(async move { p.run_at(now).await })
        };
        gate.entered.notified().await;
        assert!(p.is_running());

        let second = p.run_at(now).await;
        assert!(matches!(second, Err(PipelineError::AlreadyRunning)));
        assert_eq!(to_report(&second, now).error.as_deref(), Some("CLEANUP_IN_PROGRESS"));

        gate.release.notify_one();
        let summary = first.await.unwrap().unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(!p.is_running());
    }
}
