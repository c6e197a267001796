//! Full-dataset views assembled from a page-at-a-time listing.
//!
//! Cross-page features (searching every title, exporting everything,
//! filtering a report by owner and date range) walk the listing from page 1
//! until the last page reported by the most recent response, concatenate the
//! items, then sort and filter in memory.
//!
//! The walk is not a transactional snapshot. A write that lands between two
//! page fetches can make a record show up twice, go missing or appear out of
//! position. The walk neither hides nor repairs that: callers see exactly
//! what the pages contained.
//!
//! The walk is bounded by `max_pages`. Hitting the bound sets
//! [`WalkOutcome::truncated`]; a failing fetch stops the walk and is reported
//! in [`WalkOutcome::error`] next to whatever was already fetched.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{DocError, DocResult};
use crate::models::Document;
use crate::query::{paginate, ListFilter, ListQuery, Page, PageRequest, SortKey};
use crate::store::DocumentStore;

/// Anything that can serve one page of documents.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> DocResult<Page<Document>>;
}

/// Result of walking every page of a [`PageSource`].
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Items in the order the pages returned them.
    pub items: Vec<Document>,
    pub pages_fetched: u32,
    /// `total_pages` as reported by the last successful fetch.
    pub total_pages: u32,
    pub truncated: bool,
    pub error: Option<DocError>,
}

impl WalkOutcome {
    pub fn is_complete(&self) -> bool {
        !self.truncated && self.error.is_none()
    }
}

/// Fetches pages 1, 2, ... until the last one, `max_pages` fetches, or the
/// first error, whichever comes first.
pub async fn walk_pages<S>(source: &S, page_size: u32, max_pages: u32) -> WalkOutcome
where
    S: PageSource + ?Sized,
{
    let mut outcome = WalkOutcome::default();
    let mut page: u32 = 1;

    loop {
        if outcome.pages_fetched >= max_pages {
            outcome.truncated = true;
            break;
        }
        let request = match PageRequest::new(page as i64, page_size as i64) {
            Ok(r) => r,
            Err(e) => {
                outcome.error = Some(e);
                break;
            }
        };
        match source.fetch_page(request).await {
            Ok(fetched) => {
                outcome.pages_fetched += 1;
                outcome.total_pages = fetched.total_pages;
                outcome.items.extend(fetched.items);
            }
            Err(e) => {
                outcome.error = Some(e);
                break;
            }
        }
        page = page.saturating_add(1);
        if page > outcome.total_pages {
            break;
        }
    }

    outcome
}

/// Orders by business date, newest first, then by creation time.
pub fn sort_for_report(items: &mut [Document]) {
    items.sort_by(|a, b| SortKey::EffectiveDate.compare_desc(a, b));
}

/// In-memory predicates applied after a walk. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
    /// Case-insensitive substring of the owner username.
    pub owner_contains: Option<String>,
    /// Inclusive lower bound on the business date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the business date.
    pub to: Option<NaiveDate>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ReportFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(title) = &self.title_contains {
            if !contains_ci(&doc.title, title) {
                return false;
            }
        }
        if let Some(owner) = &self.owner_contains {
            if !contains_ci(&doc.owner_username, owner) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if doc.effective_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if doc.effective_date > to {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, items: Vec<Document>) -> Vec<Document> {
        items.into_iter().filter(|d| self.matches(d)).collect()
    }
}

/// Slices an aggregated list locally, independent of server pages.
pub fn local_page(items: Vec<Document>, page: u32, per_page: u32) -> DocResult<Page<Document>> {
    let request = PageRequest::new(page as i64, per_page as i64)?;
    Ok(paginate(items, request))
}

/// A sorted, filtered full-dataset view plus how it was obtained.
#[derive(Debug)]
pub struct Report {
    pub documents: Vec<Document>,
    /// Records fetched before filtering.
    pub scanned: usize,
    pub pages_fetched: u32,
    pub total_pages: u32,
    pub truncated: bool,
    pub error: Option<DocError>,
}

/// Walks every page, then sorts and filters what was fetched.
pub async fn build_report<S>(
    source: &S,
    page_size: u32,
    max_pages: u32,
    filter: &ReportFilter,
) -> Report
where
    S: PageSource + ?Sized,
{
    let walk = walk_pages(source, page_size, max_pages).await;
    let scanned = walk.items.len();
    let mut documents = filter.apply(walk.items);
    sort_for_report(&mut documents);
    Report {
        documents,
        scanned,
        pages_fetched: walk.pages_fetched,
        total_pages: walk.total_pages,
        truncated: walk.truncated,
        error: walk.error,
    }
}

/// Serves pages straight from a [`DocumentStore`].
pub struct StorePageSource<'a> {
    store: &'a dyn DocumentStore,
    filter: ListFilter,
}

impl<'a> StorePageSource<'a> {
    pub fn global(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            filter: ListFilter::default(),
        }
    }

    pub fn owner(store: &'a dyn DocumentStore, owner: impl Into<String>) -> Self {
        Self {
            store,
            filter: ListFilter {
                owner: Some(owner.into()),
            },
        }
    }
}

#[async_trait]
impl PageSource for StorePageSource<'_> {
    async fn fetch_page(&self, request: PageRequest) -> DocResult<Page<Document>> {
        let query = match &self.filter.owner {
            Some(owner) => ListQuery::owner(owner.clone(), request),
            None => ListQuery::global(request),
        };
        self.store.list(&query).await
    }
}
