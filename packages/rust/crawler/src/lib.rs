//! Catalog page fetching and HTML extraction.
//!
//! This crate provides:
//! - [`PageLoader`] — the injected transport seam, with [`HttpPageLoader`]
//!   as the production implementation
//! - [`extract_labeled_links`] — labeled link lists (years, semesters, subjects)
//! - [`parse_course_table`] — course stubs from a subject page
//! - [`extract_description`] — the description paragraph of a detail page

pub mod fetcher;
pub mod parse;

pub use fetcher::{HttpPageLoader, PageLoader};
pub use parse::{
    CATALOG_LINK_SELECTOR, LabeledLink, extract_description, extract_labeled_links,
    parse_course_table,
};
