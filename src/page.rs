//! Page reference classification
//!
//! A page reference is a string key identifying one wiki node. Prefixes
//! decide how the crawl treats it:
//! - `Category:` — a category listing to expand
//! - `index.php?title=Category:` — a paginated continuation of a listing
//! - `User:` — excluded namespace, dropped before entering the frontier
//! - anything else — a content page

/// Kind of node a page reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A category listing page
    Category,
    /// A paginated tail of some category listing
    Continuation,
    /// A content page
    Content,
}

/// Prefix marking a category reference
pub const CATEGORY_PREFIX: &str = "Category:";

/// Prefix marking a continuation path of a category listing
const CONTINUATION_PREFIX: &str = "index.php?title=Category:";

/// Namespace prefix excluded from the crawl
const EXCLUDED_PREFIX: &str = "User:";

/// Normalizes a raw reference lifted from a page or API response
///
/// Trims whitespace and strips at most one leading `/` (listing hrefs are
/// site-absolute). Returns `None` for refs that normalize to nothing.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Classifies a normalized reference by its prefix
pub fn classify(reference: &str) -> RefKind {
    if reference.starts_with(CATEGORY_PREFIX) {
        RefKind::Category
    } else if reference.starts_with(CONTINUATION_PREFIX) {
        RefKind::Continuation
    } else {
        RefKind::Content
    }
}

/// Returns true for refs in namespaces the crawl never enters
pub fn is_excluded(reference: &str) -> bool {
    reference.starts_with(EXCLUDED_PREFIX)
}

/// Derives the aggregation key of a category or continuation reference
///
/// `Category:X` and `index.php?title=Category:X&pagefrom=…` both key as
/// `X`, so a continuation records its members under the listing it
/// continues. Returns `None` for content refs.
pub fn category_key(reference: &str) -> Option<String> {
    if let Some(name) = reference.strip_prefix(CATEGORY_PREFIX) {
        return Some(name.to_string());
    }
    if let Some(query) = reference.strip_prefix(CONTINUATION_PREFIX) {
        let name = query.split('&').next().unwrap_or(query);
        return Some(name.to_string());
    }
    None
}

/// Builds the `Category:<name>` reference for a content page's own category
pub fn member_category(name: &str) -> String {
    format!("{}{}", CATEGORY_PREFIX, name)
}

/// Strips the category prefix from a reverse-lookup category title
///
/// The category-membership API reports owning categories with the prefix
/// attached; aggregation keys carry the bare name.
pub fn strip_category_prefix(title: &str) -> &str {
    title.strip_prefix(CATEGORY_PREFIX).unwrap_or(title)
}
