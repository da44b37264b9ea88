//! Crawl/extract/aggregate pipeline core.
//!
//! This crate owns the only parts of the system with real coordination
//! problems:
//! - [`scheduler::CrawlScheduler`] — subject fan-out under two independent
//!   concurrency gates
//! - [`worker`] — per-subject crawl + per-course enrichment
//! - [`writer::DirectoryWriter`] — locked appends to the output artifact
//! - [`pipeline`] — the end-to-end run
//!
//! The LLM extraction backend implements the [`FactsExtractor`] trait defined
//! here; infrastructure adapters depend on this crate, never the reverse.

pub mod pipeline;
pub mod scheduler;
#[cfg(test)]
pub(crate) mod testutil;
pub mod worker;
pub mod writer;

use async_trait::async_trait;
use courseatlas_shared::{CourseFacts, Result};

pub use pipeline::{
    FixedNavigator, Navigator, ProgressReporter, RunConfig, RunSummary, SilentProgress, run_crawl,
};
pub use scheduler::{CrawlOutcome, CrawlScheduler, merge_into};
pub use worker::SubjectReport;
pub use writer::DirectoryWriter;

/// Turns free-text course descriptions into validated [`CourseFacts`].
///
/// Implementations do not retry and do not limit their own concurrency; the
/// scheduler's LLM gate bounds in-flight calls externally.
#[async_trait]
pub trait FactsExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<CourseFacts>;
}
