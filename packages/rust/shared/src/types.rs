//! Core domain types for the course catalog directory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// Sentinel used in `prereq`/`gened` when the source text states that no
/// requirement exists. An *empty* list means extraction could not determine
/// either way (degraded record).
pub const NONE_SENTINEL: &str = "N/A";

// ---------------------------------------------------------------------------
// SubjectListing
// ---------------------------------------------------------------------------

/// One academic subject (department) on the semester page.
/// Created once per crawl run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectListing {
    /// Display label, e.g. "Computer Science".
    pub label: String,
    /// Absolute URL of the subject's course listing page.
    pub link: Url,
}

// ---------------------------------------------------------------------------
// CourseStub
// ---------------------------------------------------------------------------

/// Minimal identifying info for a course before enrichment — one table row
/// on a subject page. `code` is unique within a subject but not globally;
/// directory keys are the raw code string and collisions overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStub {
    /// Course code, e.g. "CS 101".
    pub code: String,
    /// Course title.
    pub name: String,
    /// Absolute URL of the course detail page.
    pub detail_link: Url,
}

// ---------------------------------------------------------------------------
// CourseFacts
// ---------------------------------------------------------------------------

/// Structured facts extracted from a course description by the LLM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFacts {
    /// Credit hours, if stated.
    pub credit: Option<i64>,
    /// Prerequisite course codes, or `["N/A"]` when none are required.
    pub prereq: Vec<String>,
    /// General-education tags, or `["N/A"]` when the course satisfies none.
    pub gened: Vec<String>,
}

// ---------------------------------------------------------------------------
// CourseRecord
// ---------------------------------------------------------------------------

/// A [`CourseStub`] merged with its [`CourseFacts`]; the unit persisted to
/// the output artifact. Degraded records keep empty facts and carry a
/// diagnostic describing what failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub code: String,
    pub name: String,
    pub detail_link: Url,
    pub facts: CourseFacts,
    /// Error tag attached when detail fetch or extraction failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl CourseRecord {
    /// Build a complete record from a stub and its extracted facts.
    pub fn complete(stub: CourseStub, facts: CourseFacts) -> Self {
        Self {
            code: stub.code,
            name: stub.name,
            detail_link: stub.detail_link,
            facts,
            diagnostic: None,
        }
    }

    /// Build a degraded record: facts left empty, error tagged.
    /// Every discovered stub must appear in the output, degraded or not.
    pub fn degraded(stub: CourseStub, diagnostic: impl Into<String>) -> Self {
        Self {
            code: stub.code,
            name: stub.name,
            detail_link: stub.detail_link,
            facts: CourseFacts::default(),
            diagnostic: Some(diagnostic.into()),
        }
    }

    /// Whether this record has degraded (empty) facts.
    pub fn is_degraded(&self) -> bool {
        self.diagnostic.is_some()
    }
}

/// Mapping from course code to record. A `BTreeMap` keeps iteration (and
/// therefore the written artifact) identical regardless of the order in
/// which subject workers completed.
pub type CourseDirectory = BTreeMap<String, CourseRecord>;

// ---------------------------------------------------------------------------
// RowWarning
// ---------------------------------------------------------------------------

/// A recorded, non-fatal problem with one table row of a subject page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    /// Subject label the row belongs to (filled in by the worker).
    pub subject: String,
    /// Zero-based row index within the course table.
    pub row: usize,
    /// What was wrong with the row.
    pub message: String,
}
