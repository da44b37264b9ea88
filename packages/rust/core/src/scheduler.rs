//! Subject fan-out under two independent concurrency gates.
//!
//! The scheduler launches one task per subject listing, bounded by the
//! subject gate; every worker shares one global LLM gate for its extraction
//! calls (the LLM backend has a materially smaller safe concurrency than the
//! HTTP target, hence two caps rather than one). Outcomes are collected
//! without short-circuiting and successful partial directories merge
//! last-write-wins into one consistent [`CourseDirectory`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use courseatlas_crawler::PageLoader;
use courseatlas_shared::{CatalogError, CourseDirectory, Result, RowWarning, SubjectListing};

use crate::worker;
use crate::FactsExtractor;

/// Summary of a completed crawl over all subjects.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// The merged, deduplicated course directory.
    pub directory: CourseDirectory,
    /// Number of subjects that produced a partial directory.
    pub subjects_ok: usize,
    /// Subjects that failed outright (label, error message).
    pub failed: Vec<(String, String)>,
    /// Row-level warnings recorded across all subjects.
    pub warnings: Vec<RowWarning>,
    /// Number of records emitted with degraded facts.
    pub degraded: usize,
    /// Total crawl duration.
    pub elapsed: Duration,
}

/// Fans subject crawls out under the subject gate and merges their results.
pub struct CrawlScheduler {
    loader: Arc<dyn PageLoader>,
    extractor: Arc<dyn FactsExtractor>,
    subject_gate: Arc<Semaphore>,
    llm_gate: Arc<Semaphore>,
}

impl std::fmt::Debug for CrawlScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlScheduler")
            .field("subject_gate", &self.subject_gate)
            .field("llm_gate", &self.llm_gate)
            .finish_non_exhaustive()
    }
}

impl CrawlScheduler {
    /// Create a scheduler with its two gates.
    ///
    /// Both caps must be at least 1 — an empty gate could never hand out a
    /// permit and `run` would wait on it forever. `llm_concurrency` is
    /// shared globally across all subjects and should stay at or below
    /// `subject_concurrency` in typical configuration.
    pub fn new(
        loader: Arc<dyn PageLoader>,
        extractor: Arc<dyn FactsExtractor>,
        subject_concurrency: usize,
        llm_concurrency: usize,
    ) -> Result<Self> {
        if subject_concurrency == 0 || llm_concurrency == 0 {
            return Err(CatalogError::validation(format!(
                "concurrency caps must be at least 1 \
                 (subjects: {subject_concurrency}, llm: {llm_concurrency})"
            )));
        }
        Ok(Self {
            loader,
            extractor,
            subject_gate: Arc::new(Semaphore::new(subject_concurrency)),
            llm_gate: Arc::new(Semaphore::new(llm_concurrency)),
        })
    }

    /// Crawl every subject and merge the partial directories.
    ///
    /// A single failing subject never cancels its siblings; the run as a
    /// whole fails with [`CatalogError::Aggregate`] only when *zero*
    /// subjects succeeded.
    pub async fn run(&self, subjects: Vec<SubjectListing>) -> Result<CrawlOutcome> {
        let start = Instant::now();
        let total = subjects.len();

        tracing::info!(
            subjects = total,
            subject_permits = self.subject_gate.available_permits(),
            llm_permits = self.llm_gate.available_permits(),
            "starting crawl"
        );

        let mut tasks = JoinSet::new();
        for listing in subjects {
            let loader = Arc::clone(&self.loader);
            let extractor = Arc::clone(&self.extractor);
            let subject_gate = Arc::clone(&self.subject_gate);
            let llm_gate = Arc::clone(&self.llm_gate);

            tasks.spawn(async move {
                // Permit held for the worker's whole lifetime, released on
                // success, failure, and cancellation alike.
                let _permit = subject_gate
                    .acquire_owned()
                    .await
                    .expect("subject gate closed");
                let result =
                    worker::process(loader.as_ref(), extractor.as_ref(), &llm_gate, &listing).await;
                (listing, result)
            });
        }

        let mut directory = CourseDirectory::new();
        let mut warnings = Vec::new();
        let mut failed = Vec::new();
        let mut subjects_ok = 0;
        let mut degraded = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((listing, Ok(report))) => {
                    tracing::debug!(
                        subject = %listing.label,
                        courses = report.directory.len(),
                        degraded = report.degraded,
                        "subject complete"
                    );
                    subjects_ok += 1;
                    degraded += report.degraded;
                    warnings.extend(report.warnings);
                    merge_into(&mut directory, report.directory);
                }
                Ok((listing, Err(e))) => {
                    tracing::warn!(subject = %listing.label, error = %e, "subject failed");
                    failed.push((listing.label, e.to_string()));
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "subject task panicked");
                    failed.push(("<task>".to_string(), join_err.to_string()));
                }
            }
        }

        if subjects_ok == 0 && total > 0 {
            return Err(CatalogError::Aggregate {
                failed: failed.len(),
            });
        }

        let outcome = CrawlOutcome {
            directory,
            subjects_ok,
            failed,
            warnings,
            degraded,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            subjects_ok = outcome.subjects_ok,
            subjects_failed = outcome.failed.len(),
            courses = outcome.directory.len(),
            degraded = outcome.degraded,
            elapsed_ms = outcome.elapsed.as_millis(),
            "crawl complete"
        );

        Ok(outcome)
    }
}

/// Merge one partial directory into the aggregate, last-writer-wins.
///
/// Duplicate codes across subjects should not occur in a well-formed catalog
/// but must not crash; the collision is logged and the later value kept.
pub fn merge_into(directory: &mut CourseDirectory, partial: CourseDirectory) {
    for (code, record) in partial {
        if directory.insert(code.clone(), record).is_some() {
            tracing::warn!(%code, "duplicate course code across subjects, keeping last write");
        }
    }
}
