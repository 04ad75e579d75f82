//! Response parsing for the crawl
//!
//! Two response shapes feed the orchestrator:
//! - category listing pages (HTML): member links live in the
//!   `#mw-subcategories` and `#mw-pages` containers, with pagination links
//!   routed through `index.php`
//! - the category-membership API (JSON): reverse lookup of the categories
//!   a page belongs to
//!
//! Parsing is CPU-bound and runs on the blocking pool; everything here is
//! synchronous.

use crate::page;
use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Child refs extracted from one category listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPage {
    /// Subcategory refs (`Category:` prefixed)
    pub sub_categories: Vec<String>,
    /// Member content page refs
    pub sub_pages: Vec<String>,
    /// Pagination continuation paths of this listing
    pub continuations: Vec<String>,
}

impl CategoryPage {
    /// The empty child set a failed or unparseable node degrades to
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Parses a category listing page into its child refs
///
/// Anchors under `#mw-subcategories` become subcategories, anchors under
/// `#mw-pages` become member pages. In either container, hrefs routed
/// through `index.php` are pagination links: the ones that continue a
/// category listing are kept as continuations, any other `index.php` link
/// is interface chrome and dropped.
pub fn parse_category_page(html: &str) -> CategoryPage {
    let document = Html::parse_document(html);
    let mut result = CategoryPage::default();

    collect_container_links(
        &document,
        "#mw-subcategories a[href]",
        &mut result.sub_categories,
        &mut result.continuations,
    );
    collect_container_links(
        &document,
        "#mw-pages a[href]",
        &mut result.sub_pages,
        &mut result.continuations,
    );

    result
}

/// Collects decoded link targets from one listing container
fn collect_container_links(
    document: &Html,
    selector: &str,
    members: &mut Vec<String>,
    continuations: &mut Vec<String>,
) {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return,
    };

    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(h) if !h.trim().is_empty() => h,
            _ => continue,
        };

        let decoded = decode_href(href);
        let normalized = match page::normalize(&decoded) {
            Some(n) => n,
            None => continue,
        };

        if normalized.starts_with("index.php") {
            // Only listing continuations survive; other index.php links
            // (edit, history, ...) are dropped
            if page::classify(&normalized) == page::RefKind::Continuation {
                continuations.push(normalized);
            }
        } else {
            members.push(normalized);
        }
    }
}

/// Percent-decodes an href lifted from a listing page
pub fn decode_href(href: &str) -> String {
    percent_decode_str(href).decode_utf8_lossy().into_owned()
}

/// Response of the category-membership API
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryQueryResponse {
    #[serde(default)]
    pub query: Option<QueryBody>,
}

impl CategoryQueryResponse {
    /// The empty result a missing page or 404 answer maps to
    pub fn empty() -> Self {
        Self { query: None }
    }
}

/// `query` object of the API response
#[derive(Debug, Clone, Deserialize)]
pub struct QueryBody {
    /// Result pages keyed by page id
    #[serde(default)]
    pub pages: HashMap<String, QueryPage>,

    /// Title normalizations applied by the API (queried `from` → reported
    /// `to`)
    #[serde(default)]
    pub normalized: Vec<NormalizedTitle>,
}

/// One page entry of the API response
#[derive(Debug, Clone, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub title: Option<String>,

    /// Present when the queried page does not exist
    #[serde(default)]
    pub missing: Option<serde_json::Value>,

    #[serde(default)]
    pub categories: Vec<CategoryTitle>,
}

/// Category entry of one result page
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTitle {
    pub title: String,
}

/// One from/to title normalization
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizedTitle {
    pub from: String,
    pub to: String,
}

/// Parses the category-membership API response body
pub fn parse_category_query(body: &str) -> Result<CategoryQueryResponse, serde_json::Error> {
    serde_json::from_str(body)
}

/// Flattens an API response into (owning category, page title) pairs
///
/// Titles reported by the API are mapped back through the normalization
/// list to the queried spelling; owning categories are stripped to their
/// base name and filtered against the configured exclusion set.
pub fn flatten_category_query(
    response: &CategoryQueryResponse,
    excluded: &HashSet<String>,
) -> Vec<(String, String)> {
    let query = match &response.query {
        Some(q) => q,
        None => return Vec::new(),
    };

    let mut pairs = Vec::new();
    for entry in query.pages.values() {
        if entry.missing.is_some() {
            continue;
        }
        let title = match &entry.title {
            Some(t) if !t.is_empty() => t,
            _ => continue,
        };
        let true_title = query
            .normalized
            .iter()
            .find(|n| &n.to == title)
            .map(|n| n.from.as_str())
            .unwrap_or(title);

        for category in &entry.categories {
            let name = page::strip_category_prefix(&category.title);
            if excluded.contains(name) {
                continue;
            }
            pairs.push((name.to_string(), true_title.to_string()));
        }
    }
    pairs
}
