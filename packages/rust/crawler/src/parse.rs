//! HTML extraction for catalog pages.
//!
//! Three distinct named operations, one per page shape:
//! - [`extract_labeled_links`] — labeled link entries for year/semester/subject lists
//! - [`parse_course_table`] — ordered course stubs from a subject page
//! - [`extract_description`] — the free-text description paragraph of a detail page

use scraper::{Html, Selector};
use url::Url;

use courseatlas_shared::{CatalogError, CourseStub, Result, RowWarning};

/// The catalog renders year, semester, and subject lists as anchors inside
/// table cells.
pub const CATALOG_LINK_SELECTOR: &str = "td a[href]";

/// Course description container on a detail page.
const DESCRIPTION_SELECTOR: &str = "div.courseDescription p";

/// A link entry with its display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledLink {
    /// Trimmed anchor text.
    pub label: String,
    /// Absolute URL, resolved against the page the link appeared on.
    pub url: Url,
}

// ---------------------------------------------------------------------------
// LinkExtractor
// ---------------------------------------------------------------------------

/// Extract labeled links matching `selector`, in document order, resolved
/// against `base`. Anchors whose href cannot be joined are skipped.
pub fn extract_labeled_links(html: &str, selector: &str, base: &Url) -> Result<Vec<LabeledLink>> {
    let sel = Selector::parse(selector)
        .map_err(|e| CatalogError::parse(format!("bad selector '{selector}': {e}")))?;

    let doc = Html::parse_document(html);
    let mut links = Vec::new();

    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let label = el.text().collect::<String>().trim().to_string();
        match base.join(href) {
            Ok(mut url) => {
                url.set_fragment(None);
                links.push(LabeledLink { label, url });
            }
            Err(e) => {
                tracing::debug!(href, error = %e, "skipping unjoinable link");
            }
        }
    }

    Ok(links)
}

// ---------------------------------------------------------------------------
// CourseTableParser
// ---------------------------------------------------------------------------

/// Parse the course table of a subject page into ordered [`CourseStub`]s.
///
/// A row missing its expected cells is skipped with a recorded warning
/// rather than aborting the subject: one malformed row must never lose the
/// rest of the subject's courses. Rows with no `td` cells at all (header
/// rows) are skipped silently.
pub fn parse_course_table(
    html: &str,
    base: &Url,
    subject: &str,
) -> (Vec<CourseStub>, Vec<RowWarning>) {
    let row_sel = Selector::parse("table tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let link_sel = Selector::parse("a[href]").unwrap();

    let doc = Html::parse_document(html);
    let mut stubs = Vec::new();
    let mut warnings = Vec::new();

    let warn = |row: usize, message: String, warnings: &mut Vec<RowWarning>| {
        tracing::warn!(subject, row, %message, "malformed course row skipped");
        warnings.push(RowWarning {
            subject: subject.to_string(),
            row,
            message,
        });
    };

    for (row_idx, row) in doc.select(&row_sel).enumerate() {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.is_empty() {
            // Header row
            continue;
        }

        let Some(anchor) = row.select(&link_sel).next() else {
            warn(row_idx, "row has no link cell".into(), &mut warnings);
            continue;
        };

        let code = anchor.text().collect::<String>().trim().to_string();
        if code.is_empty() {
            warn(row_idx, "row link has empty course code".into(), &mut warnings);
            continue;
        }

        // The name lives in the first cell that is not the code cell.
        let name = cells
            .iter()
            .map(|c| c.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty() && *text != code)
            .unwrap_or_default();
        if name.is_empty() {
            warn(row_idx, format!("row for '{code}' has no name cell"), &mut warnings);
            continue;
        }

        let href = anchor.value().attr("href").unwrap_or_default();
        let detail_link = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn(
                    row_idx,
                    format!("row for '{code}' has unjoinable link '{href}': {e}"),
                    &mut warnings,
                );
                continue;
            }
        };

        stubs.push(CourseStub {
            code,
            name,
            detail_link,
        });
    }

    (stubs, warnings)
}

// ---------------------------------------------------------------------------
// DescriptionExtractor
// ---------------------------------------------------------------------------

/// Extract the free-text course description from a detail page.
///
/// Tries the catalog's description container first, then falls back to the
/// longest paragraph on the page. Returns `None` when no non-empty
/// paragraph exists.
pub fn extract_description(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let desc_sel = Selector::parse(DESCRIPTION_SELECTOR).unwrap();
    if let Some(el) = doc.select(&desc_sel).next() {
        let text = el.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }

    let p_sel = Selector::parse("p").unwrap();
    doc.select(&p_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .max_by_key(|t| t.len())
}
