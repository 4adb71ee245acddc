//! Archive-before-delete cleanup against file-backed stores

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{HOUR_MS, manager, manager_with, order_request};
use order_hub::archiving::{
    ARCHIVE_COLUMNS, ArchiveError, ArchivePipeline, ArchiveRow, ArchiveSink, CleanupScheduler,
    PipelineError,
};
use order_hub::archiving::pipeline::to_report;
use order_hub::{OrderStorage, RedbArchiveBook};
use shared::order::OrderType;
use shared::util::millis_to_rfc3339;

const TARGET: &str = "Archived Orders";
const RETENTION: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug)]
struct UnreachableSheet;

#[async_trait]
impl ArchiveSink for UnreachableSheet {
    async fn append_rows(&self, target: &str, _: &[ArchiveRow]) -> Result<usize, ArchiveError> {
        Err(ArchiveError::Unavailable(format!("{} is unreachable", target)))
    }
}

#[tokio::test]
async fn test_cleanup_after_retention_archives_then_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let m = manager_with(OrderStorage::open(dir.path().join("orders.redb")).unwrap());
    let book = Arc::new(RedbArchiveBook::open(dir.path().join("archive.redb")).unwrap());
    let pipeline = ArchivePipeline::new(m.clone(), book.clone(), TARGET, RETENTION);

    let order = m.create_order(order_request("ORD-T", OrderType::Delivery)).unwrap();
    let now = order.created_at + 25 * HOUR_MS;

    let summary = pipeline.run_at(now).await.unwrap();
    assert_eq!((summary.archived, summary.deleted), (1, 1));
    assert!(m.get_order("ORD-T").is_err());
    assert_eq!(m.order_count().unwrap(), 0);

    let rows = book.rows(TARGET).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], ARCHIVE_COLUMNS.map(String::from).to_vec());
    let row = &rows[1];
    assert_eq!(row[0], "ORD-T");
    assert_eq!(row[6], "pending");

    let archived_at = &row[ARCHIVE_COLUMNS.len() - 1];
    assert!(chrono::DateTime::parse_from_rfc3339(archived_at).is_ok());
    assert_eq!(archived_at, &millis_to_rfc3339(now));

    let report = to_report(&Ok(summary), now);
    assert!(report.success);
    assert_eq!((report.archived, report.deleted), (1, 1));

    // Second run finds nothing and appends nothing
    let again = pipeline.run_at(now).await.unwrap();
    assert_eq!((again.archived, again.deleted), (0, 0));
    assert_eq!(book.rows(TARGET).unwrap().len(), 2);
}

#[tokio::test]
async fn test_failing_archive_deletes_nothing() {
    let m = manager();
    let mut oldest = i64::MAX;
    for i in 0..5 {
        let order = m
            .create_order(order_request(&format!("ORD-{}", i), OrderType::Pickup))
            .unwrap();
        oldest = oldest.min(order.created_at);
    }
    let pipeline = ArchivePipeline::new(m.clone(), Arc::new(UnreachableSheet), TARGET, RETENTION);

    let now = oldest + 48 * HOUR_MS;
    let result = pipeline.run_at(now).await;
    assert!(matches!(result, Err(PipelineError::Archive(_))));
    assert_eq!(m.order_count().unwrap(), 5);

    let report = to_report(&result, now);
    assert!(!report.success);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.error.as_deref(), Some("ARCHIVE_FAILED"));
    assert!(!pipeline.is_running());
}

#[tokio::test]
async fn test_store_reopens_with_remaining_orders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.redb");
    {
        let m = manager_with(OrderStorage::open(&path).unwrap());
        m.create_order(order_request("KEEP", OrderType::Pickup)).unwrap();
    }

    let m = manager_with(OrderStorage::open(&path).unwrap());
    assert_eq!(m.get_order("KEEP").unwrap().order_id, "KEEP");
}

#[tokio::test]
async fn test_manual_trigger_reports_through_scheduler() {
    let m = manager();
    m.create_order(order_request("YOUNG", OrderType::Pickup)).unwrap();
    let book = Arc::new(RedbArchiveBook::open_in_memory().unwrap());
    let pipeline = Arc::new(ArchivePipeline::new(m.clone(), book, TARGET, RETENTION));
    let scheduler = CleanupScheduler::new(pipeline, Duration::from_secs(3600));

    let report = scheduler.trigger_now().await;
    assert!(report.success);
    assert_eq!((report.archived, report.deleted), (0, 0));
    assert_eq!(m.order_count().unwrap(), 1);
}
