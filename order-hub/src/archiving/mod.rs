//! 归档模块
//!
//! - [`sink`]: archive row layout and durable row book
//! - [`pipeline`]: archive-before-delete run
//! - [`scheduler`]: interval + manual trigger

pub mod pipeline;
pub mod scheduler;
pub mod sink;

pub use pipeline::{ArchivePipeline, CleanupSummary, PipelineError};
pub use scheduler::CleanupScheduler;
pub use sink::{ARCHIVE_COLUMNS, ArchiveError, ArchiveRow, ArchiveSink, RedbArchiveBook};
