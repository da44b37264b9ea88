//! Per-subject crawl and enrichment.
//!
//! One worker handles one subject: fetch the subject page, parse its course
//! table, then for each course sequentially fetch the detail page and run the
//! LLM extraction under the shared gate. Concurrency exists across subjects,
//! not within one subject's course loop.

use tokio::sync::Semaphore;

use courseatlas_crawler::{PageLoader, extract_description, parse_course_table};
use courseatlas_shared::{CourseDirectory, CourseRecord, CourseStub, Result, RowWarning, SubjectListing};

use crate::FactsExtractor;

/// The partial directory produced by one subject, with its row warnings and
/// the count of records that ended up degraded.
#[derive(Debug, Default)]
pub struct SubjectReport {
    pub directory: CourseDirectory,
    pub warnings: Vec<RowWarning>,
    pub degraded: usize,
}

/// Crawl one subject into a partial [`CourseDirectory`].
///
/// A transport failure on the subject page itself fails the whole subject
/// (propagated, not swallowed). Failures below that — a malformed row, a
/// dead detail link, unusable model output — degrade the affected row or
/// course only: every discovered stub appears in the report, degraded or not.
pub async fn process(
    loader: &dyn PageLoader,
    extractor: &dyn FactsExtractor,
    llm_gate: &Semaphore,
    listing: &SubjectListing,
) -> Result<SubjectReport> {
    let html = loader.fetch(&listing.link).await?;
    let (stubs, warnings) = parse_course_table(&html, &listing.link, &listing.label);

    tracing::debug!(
        subject = %listing.label,
        courses = stubs.len(),
        warnings = warnings.len(),
        "subject page parsed"
    );

    let mut directory = CourseDirectory::new();
    let mut degraded = 0;

    for stub in stubs {
        let record = enrich_course(loader, extractor, llm_gate, stub).await;
        if record.is_degraded() {
            degraded += 1;
        }
        directory.insert(record.code.clone(), record);
    }

    Ok(SubjectReport {
        directory,
        warnings,
        degraded,
    })
}

/// Fetch one course's detail page and extract its facts.
///
/// Never fails: any error along the way produces a degraded record carrying
/// the diagnostic. The LLM gate is held only across the extraction call.
async fn enrich_course(
    loader: &dyn PageLoader,
    extractor: &dyn FactsExtractor,
    llm_gate: &Semaphore,
    stub: CourseStub,
) -> CourseRecord {
    let html = match loader.fetch(&stub.detail_link).await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(code = %stub.code, error = %e, "detail fetch failed, degrading record");
            return CourseRecord::degraded(stub, format!("detail fetch failed: {e}"));
        }
    };

    let Some(description) = extract_description(&html) else {
        tracing::warn!(code = %stub.code, "no description paragraph, degrading record");
        return CourseRecord::degraded(stub, "no description paragraph found");
    };

    let facts = {
        let _permit = llm_gate.acquire().await.expect("llm gate closed");
        extractor.extract(&description).await
    };

    match facts {
        Ok(facts) => CourseRecord::complete(stub, facts),
        Err(e) => {
            tracing::warn!(code = %stub.code, error = %e, "extraction failed, degrading record");
            CourseRecord::degraded(stub, format!("extraction failed: {e}"))
        }
    }
}
