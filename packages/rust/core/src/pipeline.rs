//! End-to-end crawl pipeline: semester → subjects → scheduler → artifact.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};
use url::Url;

use courseatlas_crawler::{CATALOG_LINK_SELECTOR, PageLoader, extract_labeled_links};
use courseatlas_shared::{CatalogError, Result, SubjectListing};

use crate::writer::DirectoryWriter;
use crate::{CrawlScheduler, FactsExtractor};

/// Configuration for one crawl run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Cap on subjects crawled in parallel.
    pub subject_concurrency: usize,
    /// Global cap on in-flight extraction calls.
    pub llm_concurrency: usize,
    /// Output artifact path.
    pub output_path: PathBuf,
}

/// Result of a completed crawl run.
#[derive(Debug)]
pub struct RunSummary {
    /// Subjects discovered on the semester page.
    pub subjects_total: usize,
    /// Subjects that produced records.
    pub subjects_ok: usize,
    /// Subjects that failed outright (label, error message).
    pub failed: Vec<(String, String)>,
    /// Records written to the artifact.
    pub courses: usize,
    /// Records written with degraded facts.
    pub degraded: usize,
    /// Row-level warnings recorded while parsing subject pages.
    pub warnings: usize,
    /// Where the artifact was written.
    pub output_path: PathBuf,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Resolves the semester page URL the crawl starts from.
///
/// The CLI's interactive implementation walks the year page and asks the
/// operator to pick; [`FixedNavigator`] skips straight to a known URL.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn semester_url(&self, loader: &dyn PageLoader) -> Result<Url>;
}

/// Navigator that returns a pre-resolved semester URL.
pub struct FixedNavigator {
    url: Url,
}

impl FixedNavigator {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Navigator for FixedNavigator {
    async fn semester_url(&self, _loader: &dyn PageLoader) -> Result<Url> {
        Ok(self.url.clone())
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full crawl pipeline.
///
/// 1. Resolve the semester page URL via the navigator
/// 2. List subjects on the semester page
/// 3. Crawl all subjects under the scheduler's two gates
/// 4. Append the merged directory to the output artifact
///
/// The artifact is not touched unless the crawl as a whole succeeds.
#[instrument(skip_all, fields(output = %config.output_path.display()))]
pub async fn run_crawl(
    config: &RunConfig,
    navigator: &dyn Navigator,
    loader: Arc<dyn PageLoader>,
    extractor: Arc<dyn FactsExtractor>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    // --- Phase 1: Resolve semester ---
    progress.phase("Resolving semester");
    let semester_url = navigator.semester_url(loader.as_ref()).await?;
    info!(url = %semester_url, "semester resolved");

    // --- Phase 2: List subjects ---
    progress.phase("Listing subjects");
    let html = loader.fetch(&semester_url).await?;
    let subjects: Vec<SubjectListing> =
        extract_labeled_links(&html, CATALOG_LINK_SELECTOR, &semester_url)?
            .into_iter()
            .map(|link| SubjectListing {
                label: link.label,
                link: link.url,
            })
            .collect();

    if subjects.is_empty() {
        return Err(CatalogError::validation(format!(
            "no subject links found on {semester_url}"
        )));
    }
    info!(subjects = subjects.len(), "subjects listed");
    let subjects_total = subjects.len();

    // --- Phase 3: Crawl ---
    progress.phase("Crawling subjects");
    let scheduler = CrawlScheduler::new(
        loader,
        extractor,
        config.subject_concurrency,
        config.llm_concurrency,
    )?;
    let outcome = scheduler.run(subjects).await?;

    // --- Phase 4: Write artifact ---
    progress.phase("Writing directory");
    let writer = DirectoryWriter::new(&config.output_path);
    let records: Vec<_> = outcome.directory.values().cloned().collect();
    writer.append(&records).await?;

    let summary = RunSummary {
        subjects_total,
        subjects_ok: outcome.subjects_ok,
        failed: outcome.failed,
        courses: records.len(),
        degraded: outcome.degraded,
        warnings: outcome.warnings.len(),
        output_path: config.output_path.clone(),
        elapsed: outcome.elapsed,
    };

    info!(
        courses = summary.courses,
        degraded = summary.degraded,
        subjects_ok = summary.subjects_ok,
        failed = summary.failed.len(),
        "crawl complete"
    );
    progress.done(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeExtractor, FakeLoader, course_row, detail_page, subject_page};

    fn semester_page(subjects: &[(&str, &str)]) -> String {
        let rows: Vec<String> = subjects
            .iter()
            .map(|(label, href)| format!(r#"<tr><td><a href="{href}">{label}</a></td></tr>"#))
            .collect();
        format!("<table>{}</table>", rows.join("\n"))
    }

    fn config(output_path: PathBuf) -> RunConfig {
        RunConfig {
            subject_concurrency: 4,
            llm_concurrency: 2,
            output_path,
        }
    }

    #[tokio::test]
    async fn end_to_end_writes_merged_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("directory.txt");

        let loader = Arc::new(
            FakeLoader::new()
                .page(
                    "/2025/fall/",
                    semester_page(&[("Computer Science", "/2025/fall/CS/"), (
                        "Mathematics",
                        "/2025/fall/MATH/",
                    )]),
                )
                .page(
                    "/2025/fall/CS/",
                    subject_page(&[course_row("CS 101", "Intro Computing", "/2025/fall/CS/101/")]),
                )
                .page(
                    "/2025/fall/MATH/",
                    subject_page(&[course_row("MATH 241", "Calculus III", "/2025/fall/MATH/241/")]),
                )
                .page("/2025/fall/CS/101/", detail_page("Programming basics."))
                .page("/2025/fall/MATH/241/", detail_page("Multivariable calculus.")),
        ) as Arc<dyn PageLoader>;
        let extractor = Arc::new(FakeExtractor::ok()) as Arc<dyn FactsExtractor>;

        let navigator =
            FixedNavigator::new(Url::parse("https://catalog.example.edu/2025/fall/").unwrap());
        let summary = run_crawl(
            &config(out.clone()),
            &navigator,
            loader,
            extractor,
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(summary.subjects_total, 2);
        assert_eq!(summary.subjects_ok, 2);
        assert_eq!(summary.courses, 2);
        assert_eq!(summary.degraded, 0);
        assert!(summary.failed.is_empty());

        let content = std::fs::read_to_string(&out).unwrap();
        // BTreeMap ordering: CS 101 before MATH 241 regardless of completion order
        let cs = content.find("Intro Computing (CS 101).").unwrap();
        let math = content.find("Calculus III (MATH 241).").unwrap();
        assert!(cs < math);
    }

    #[tokio::test]
    async fn artifact_untouched_when_every_subject_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("directory.txt");

        let loader = Arc::new(
            FakeLoader::new()
                .page(
                    "/2025/fall/",
                    semester_page(&[("Computer Science", "/2025/fall/CS/"), (
                        "Mathematics",
                        "/2025/fall/MATH/",
                    )]),
                )
                .failing("/2025/fall/CS/")
                .failing("/2025/fall/MATH/"),
        ) as Arc<dyn PageLoader>;
        let extractor = Arc::new(FakeExtractor::ok()) as Arc<dyn FactsExtractor>;

        let navigator =
            FixedNavigator::new(Url::parse("https://catalog.example.edu/2025/fall/").unwrap());
        let err = run_crawl(
            &config(out.clone()),
            &navigator,
            loader,
            extractor,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CatalogError::Aggregate { failed: 2 }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn empty_semester_page_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(FakeLoader::new().page("/2025/fall/", "<p>maintenance</p>".into()))
            as Arc<dyn PageLoader>;
        let extractor = Arc::new(FakeExtractor::ok()) as Arc<dyn FactsExtractor>;

        let navigator =
            FixedNavigator::new(Url::parse("https://catalog.example.edu/2025/fall/").unwrap());
        let err = run_crawl(
            &config(dir.path().join("directory.txt")),
            &navigator,
            loader,
            extractor,
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CatalogError::Validation { .. }));
    }

    #[tokio::test]
    async fn zero_concurrency_fails_fast_instead_of_hanging() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("directory.txt");

        let loader = Arc::new(FakeLoader::new().page(
            "/2025/fall/",
            semester_page(&[("Computer Science", "/2025/fall/CS/")]),
        )) as Arc<dyn PageLoader>;
        let extractor = Arc::new(FakeExtractor::ok()) as Arc<dyn FactsExtractor>;

        let config = RunConfig {
            subject_concurrency: 0,
            llm_concurrency: 2,
            output_path: out.clone(),
        };
        let navigator =
            FixedNavigator::new(Url::parse("https://catalog.example.edu/2025/fall/").unwrap());

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            run_crawl(&config, &navigator, loader, extractor, &SilentProgress),
        )
        .await
        .unwrap();

        assert!(matches!(result.unwrap_err(), CatalogError::Validation { .. }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn failing_subject_still_yields_partial_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("directory.txt");

        let loader = Arc::new(
            FakeLoader::new()
                .page(
                    "/2025/fall/",
                    semester_page(&[("Computer Science", "/2025/fall/CS/"), (
                        "Mathematics",
                        "/2025/fall/MATH/",
                    )]),
                )
                .page(
                    "/2025/fall/CS/",
                    subject_page(&[course_row("CS 101", "Intro Computing", "/2025/fall/CS/101/")]),
                )
                .failing("/2025/fall/MATH/")
                .page("/2025/fall/CS/101/", detail_page("Programming basics.")),
        ) as Arc<dyn PageLoader>;
        let extractor = Arc::new(FakeExtractor::ok()) as Arc<dyn FactsExtractor>;

        let navigator =
            FixedNavigator::new(Url::parse("https://catalog.example.edu/2025/fall/").unwrap());
        let summary = run_crawl(
            &config(out.clone()),
            &navigator,
            loader,
            extractor,
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(summary.subjects_ok, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "Mathematics");
        assert!(std::fs::read_to_string(&out)
            .unwrap()
            .contains("Intro Computing (CS 101)."));
    }
}
