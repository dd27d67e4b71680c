//! # Page Analyzer Module
//!
//! Turns fetched HTML into the two things a scan needs: the page metadata
//! shown in the report summary, and the normalized visible text that the
//! matcher searches.
//!
//! Parsing never fails. The HTML5 parser recovers from malformed markup and
//! the worst outcome is an empty text. Markup without a `<body>` tag has no
//! visible text.

mod content_extraction;

pub use content_extraction::{
    DESCRIPTION_FALLBACK, MAX_DESCRIPTION_CHARS, TITLE_FALLBACK, domain_of, extract_page_info,
    has_body_tag, normalized_text,
};

use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// Metadata for an analyzed page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Title of the page
    pub title: String,

    /// URL the page was requested from
    pub url: String,

    /// Network location of the page
    pub domain: String,

    /// Meta description, truncated to [`MAX_DESCRIPTION_CHARS`]
    pub description: String,
}

/// Result of analyzing a page
#[derive(Debug, Clone)]
pub struct AnalyzedPage {
    /// Page metadata
    pub info: PageInfo,

    /// Normalized visible text of the body
    pub text: String,
}

/// Analyze raw HTML fetched from `url`
#[instrument(skip(html), fields(url = %url, html_len = html.len()))]
pub fn analyze_page(html: &str, url: &Url) -> AnalyzedPage {
    let document = Html::parse_document(html);
    let info = extract_page_info(&document, url);
    let text = normalized_text(&document, html);
    debug!(title = %info.title, text_len = text.len(), "Page analyzed");
    AnalyzedPage { info, text }
}
