//! Recursive crawl orchestration
//!
//! The orchestrator turns the category tree walk into explicit task
//! records dispatched onto the tokio runtime: each node becomes one task
//! that claims itself in the frontier, fetches and parses its page, records
//! results, and fans out child tasks.
//!
//! Completion bookkeeping follows one rule everywhere: a task submits all
//! of its children (incrementing the in-flight counter) inside its own
//! body, and its own decrement happens only after the body returns. Under
//! that ordering the quiescence counter can only reach zero when the whole
//! task tree is done.

use crate::config::CrawlConfig;
use crate::crawl::aggregate::ResultAggregator;
use crate::crawl::fetcher::SiteClient;
use crate::crawl::frontier::FrontierStore;
use crate::crawl::parser::{self, CategoryPage};
use crate::crawl::quiesce::QuiescenceDetector;
use crate::crawl::retry::RetryPolicy;
use crate::page::{self, RefKind};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Kind of work one crawl task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Expand a category listing (or one of its continuation pages)
    CategoryExpand,
    /// Record a content leaf and spawn its follow-up lookups
    ContentLeaf,
    /// Reverse lookup of the categories a content page belongs to
    CreatorQuery,
}

/// One unit of crawl work
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// Normalized page reference
    pub reference: String,
    /// Aggregation key the task's discoveries are attributed to
    pub root_key: String,
    pub kind: TaskKind,
}

/// Results of a crawl run, taken after quiescence
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Category → member-pages map
    pub snapshot: HashMap<String, BTreeSet<String>>,
    /// Sorted union of all keys and members
    pub flattened: Vec<String>,
    /// Nodes that reached the visited state
    pub visited_count: usize,
    /// Distinct (key, member) pairs recorded
    pub recorded_count: usize,
}

/// Recursive task issuer for one crawl run
///
/// Cheap to clone; every spawned task carries a clone and all clones share
/// the same run state.
#[derive(Clone)]
pub struct CrawlOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    site: Arc<SiteClient>,
    frontier: FrontierStore,
    results: ResultAggregator,
    quiesce: QuiescenceDetector,
    retry: RetryPolicy,
    query_creators: bool,
    follow_member_categories: bool,
    excluded_categories: Arc<HashSet<String>>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator with fresh run state
    pub fn new(config: &CrawlConfig, site: Arc<SiteClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                site,
                frontier: FrontierStore::new(),
                results: ResultAggregator::new(),
                quiesce: QuiescenceDetector::new(),
                retry: RetryPolicy::from_config(config),
                query_creators: config.query_creators,
                follow_member_categories: config.follow_member_categories,
                excluded_categories: Arc::new(config.excluded_categories.iter().cloned().collect()),
            }),
        }
    }

    /// Crawls the tree under the given root to quiescence
    pub async fn run(&self, root: &str) -> CrawlOutcome {
        let root_key = page::category_key(root).unwrap_or_else(|| root.to_string());
        if self.spawn_expand(root, &root_key) {
            self.inner.quiesce.wait().await;
        } else {
            tracing::warn!("Root ref '{}' was rejected; nothing to crawl", root);
        }

        CrawlOutcome {
            snapshot: self.inner.results.snapshot(),
            flattened: self.inner.results.flatten(),
            visited_count: self.inner.frontier.visited_count(),
            recorded_count: self.inner.results.recorded_count(),
        }
    }

    /// Submits an expansion task for a discovered ref
    ///
    /// Returns false without touching the counter when the ref normalizes
    /// to nothing, sits in an excluded namespace, or is a category already
    /// known to the frontier. Content refs are always submitted: their
    /// recording is per (key, leaf) pair and idempotent, while their
    /// follow-up lookups are claim-gated inside the task.
    pub fn spawn_expand(&self, reference: &str, root_key: &str) -> bool {
        let normalized = match page::normalize(reference) {
            Some(n) => n,
            None => return false,
        };
        if page::is_excluded(&normalized) {
            return false;
        }

        let kind = match page::classify(&normalized) {
            RefKind::Category | RefKind::Continuation => {
                if self.inner.frontier.is_known(&normalized) {
                    return false;
                }
                TaskKind::CategoryExpand
            }
            RefKind::Content => TaskKind::ContentLeaf,
        };

        self.spawn_task(CrawlTask {
            reference: normalized,
            root_key: root_key.to_string(),
            kind,
        });
        true
    }

    /// Registers a task with the quiescence detector and spawns it
    ///
    /// The submit happens before the spawn and the terminal after the task
    /// body, which is what makes the zero crossing of the counter
    /// definitive. The spawned future is boxed to break the recursive
    /// future type (tasks spawn tasks).
    fn spawn_task(&self, task: CrawlTask) {
        self.inner.quiesce.on_submit();
        let this = self.clone();
        let fut: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
            this.run_task(task).await;
            this.inner.quiesce.on_terminal();
        });
        tokio::spawn(fut);
    }

    /// Executes one task to its terminal state
    ///
    /// Never returns an error: node-level failures degrade to an empty
    /// child set and are logged, leaving the rest of the frontier
    /// untouched.
    async fn run_task(&self, task: CrawlTask) {
        match task.kind {
            TaskKind::CategoryExpand => self.expand_category(&task.reference).await,
            TaskKind::ContentLeaf => self.record_content(&task.reference, &task.root_key),
            TaskKind::CreatorQuery => self.creator_query(&task.reference).await,
        }
    }

    /// Claims, fetches, parses, and fans out one category listing
    async fn expand_category(&self, reference: &str) {
        if !self.inner.frontier.try_claim(reference) {
            return;
        }

        let listing = self.fetch_listing(reference).await;
        tracing::info!(
            "Listing '{}' handled: {} subcategorie(s), {} page(s), {} continuation(s)",
            reference,
            listing.sub_categories.len(),
            listing.sub_pages.len(),
            listing.continuations.len()
        );

        // The listing's own base name keys its direct members; a
        // continuation keys as the listing it continues.
        let key = match page::category_key(reference) {
            Some(k) => k,
            None => reference.to_string(),
        };

        // Fan out before this task's own completion bookkeeping
        for sub_category in &listing.sub_categories {
            let sub_key =
                page::category_key(sub_category).unwrap_or_else(|| sub_category.to_string());
            self.spawn_expand(sub_category, &sub_key);
        }
        for continuation in &listing.continuations {
            self.spawn_expand(continuation, &key);
        }
        for sub_page in &listing.sub_pages {
            self.spawn_expand(sub_page, &key);
        }

        self.inner.frontier.release(reference);
    }

    /// Records a content leaf and submits its follow-up lookups
    fn record_content(&self, reference: &str, root_key: &str) {
        self.inner.results.record(root_key, reference);

        if self.inner.query_creators && !self.inner.frontier.is_known(reference) {
            self.spawn_task(CrawlTask {
                reference: reference.to_string(),
                root_key: root_key.to_string(),
                kind: TaskKind::CreatorQuery,
            });
        }

        if self.inner.follow_member_categories {
            // A content page may head its own category of member pages
            self.spawn_expand(&page::member_category(reference), reference);
        }
    }

    /// Reverse lookup of the categories a content page belongs to
    ///
    /// Claim-gated on the page ref so concurrent rediscoveries query at
    /// most once per run.
    async fn creator_query(&self, reference: &str) {
        if !self.inner.frontier.try_claim(reference) {
            return;
        }

        let label = format!("categories of '{}'", reference);
        let fetched = self
            .inner
            .retry
            .run(&label, || self.inner.site.fetch_page_categories(reference))
            .await;

        let pairs = match fetched {
            Ok(Some(body)) => {
                let excluded = Arc::clone(&self.inner.excluded_categories);
                let parsed = tokio::task::spawn_blocking(move || {
                    parser::parse_category_query(&body)
                        .map(|response| parser::flatten_category_query(&response, &excluded))
                })
                .await;
                match parsed {
                    Ok(Ok(pairs)) => pairs,
                    Ok(Err(error)) => {
                        tracing::warn!("Unparseable category query for '{}': {}", reference, error);
                        Vec::new()
                    }
                    Err(error) => {
                        tracing::warn!(
                            "Category query worker for '{}' failed: {}",
                            reference,
                            error
                        );
                        Vec::new()
                    }
                }
            }
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!("Giving up on categories of '{}': {}", reference, error);
                Vec::new()
            }
        };

        for (category, title) in &pairs {
            self.inner.results.record(category, title);
        }
        if !pairs.is_empty() {
            tracing::debug!("'{}' belongs to {} categorie(s)", reference, pairs.len());
        }

        self.inner.frontier.release(reference);
    }

    /// Fetches and parses one listing page, degrading failures to an empty
    /// child set
    ///
    /// Retry exhaustion and parse faults blacklist the node for the run
    /// (it is still released as visited) instead of aborting the crawl.
    async fn fetch_listing(&self, reference: &str) -> CategoryPage {
        let label = format!("category page '{}'", reference);
        let body = match self
            .inner
            .retry
            .run(&label, || self.inner.site.fetch_category_page(reference))
            .await
        {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!("Giving up on listing '{}': {}", reference, error);
                return CategoryPage::empty();
            }
        };

        match tokio::task::spawn_blocking(move || parser::parse_category_page(&body)).await {
            Ok(listing) => listing,
            Err(error) => {
                tracing::warn!("Listing parse worker for '{}' failed: {}", reference, error);
                CategoryPage::empty()
            }
        }
    }
}
