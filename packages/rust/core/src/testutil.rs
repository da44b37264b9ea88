//! Instrumented fakes and HTML builders shared by the core tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use courseatlas_crawler::PageLoader;
use courseatlas_shared::{CatalogError, CourseFacts, NONE_SENTINEL, Result};

use crate::FactsExtractor;

// ---------------------------------------------------------------------------
// FakeLoader
// ---------------------------------------------------------------------------

/// In-memory [`PageLoader`] keyed by URL path, tracking peak concurrency.
pub(crate) struct FakeLoader {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    delay: Duration,
    current: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing: HashSet::new(),
            delay: Duration::ZERO,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn page(mut self, path: &str, body: String) -> Self {
        self.pages.insert(path.to_string(), body);
        self
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    /// Hold each fetch open long enough for concurrent fetches to overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PageLoader for FakeLoader {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let path = url.path().to_string();
        let result = if self.failing.contains(&path) {
            Err(CatalogError::fetch(url.as_str(), "HTTP 503"))
        } else {
            self.pages
                .get(&path)
                .cloned()
                .ok_or_else(|| CatalogError::fetch(url.as_str(), "HTTP 404"))
        };

        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ---------------------------------------------------------------------------
// FakeExtractor
// ---------------------------------------------------------------------------

/// Canned [`FactsExtractor`] tracking peak in-flight calls.
pub(crate) struct FakeExtractor {
    fail_marker: Option<String>,
    delay: Duration,
    current: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeExtractor {
    pub fn ok() -> Self {
        Self {
            fail_marker: None,
            delay: Duration::ZERO,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Fail extraction for any description containing `marker`.
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::ok()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl FactsExtractor for FakeExtractor {
    async fn extract(&self, text: &str) -> Result<CourseFacts> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match &self.fail_marker {
            Some(marker) if text.contains(marker) => Err(CatalogError::Extraction(
                "model output was not valid JSON".into(),
            )),
            _ => Ok(CourseFacts {
                credit: Some(3),
                prereq: vec![NONE_SENTINEL.into()],
                gened: vec![NONE_SENTINEL.into()],
            }),
        };

        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ---------------------------------------------------------------------------
// HTML builders
// ---------------------------------------------------------------------------

pub(crate) fn course_row(code: &str, name: &str, href: &str) -> String {
    format!(r#"<tr><td><a href="{href}">{code}</a></td><td>{name}</td></tr>"#)
}

pub(crate) fn subject_page(rows: &[String]) -> String {
    format!(
        "<table><tr><th>Code</th><th>Title</th></tr>{}</table>",
        rows.join("\n")
    )
}

pub(crate) fn detail_page(description: &str) -> String {
    format!(
        r#"<html><body><div class="courseDescription"><p>{description}</p></div></body></html>"#
    )
}
