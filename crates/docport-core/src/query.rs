//! Listing, ordering and pagination rules.
//!
//! Every store answers [`ListQuery`]s with the same semantics:
//!
//! - filtering is equality on the owner username, or nothing at all;
//! - the global listing orders by business date (`effective_date`), newest
//!   first, ties broken by `created_at` then `id`, both descending;
//! - the owner listing orders by `created_at` descending, ties broken by `id`;
//! - `total_pages = ceil(matching / page_size)`, and a page past the end is
//!   an empty page, not an error.

use std::cmp::Ordering;

use crate::error::{DocError, DocResult};
use crate::models::Document;

pub const DEFAULT_PAGE: u32 = 1;
/// Page size of the owner listing when the caller gives none.
pub const DEFAULT_OWNER_PAGE_SIZE: u32 = 10;
/// Page size of the global listing when the caller gives none.
pub const DEFAULT_GLOBAL_PAGE_SIZE: u32 = 7;

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Fails fast on `page < 1` or `page_size < 1`.
    pub fn new(page: i64, page_size: i64) -> DocResult<Self> {
        if page < 1 {
            return Err(DocError::validation(format!("page must be >= 1, got {page}")));
        }
        if page_size < 1 {
            return Err(DocError::validation(format!(
                "limit must be >= 1, got {page_size}"
            )));
        }
        Ok(Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            page_size: u32::try_from(page_size).unwrap_or(u32::MAX),
        })
    }

    /// A single page holding every matching record.
    pub fn everything() -> Self {
        Self {
            page: 1,
            page_size: u32::MAX,
        }
    }

    /// Lowers the page size to `max` when it exceeds it.
    pub fn clamped(self, max: u32) -> Self {
        Self {
            page: self.page,
            page_size: self.page_size.min(max.max(1)),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of records skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

pub fn total_pages(matching: u64, page_size: u32) -> u32 {
    let size = page_size.max(1) as u64;
    u32::try_from(matching.div_ceil(size)).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    EffectiveDate,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

impl SortKey {
    /// Orders two documents newest first under this key.
    pub fn compare_desc(&self, a: &Document, b: &Document) -> Ordering {
        let primary = match self {
            SortKey::EffectiveDate => b
                .effective_date
                .cmp(&a.effective_date)
                .then_with(|| b.created_at.cmp(&a.created_at)),
            SortKey::CreatedAt => b.created_at.cmp(&a.created_at),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }

    pub fn compare(&self, order: SortOrder, a: &Document, b: &Document) -> Ordering {
        match order {
            SortOrder::Descending => self.compare_desc(a, b),
            SortOrder::Ascending => self.compare_desc(b, a),
        }
    }
}

/// Equality-only filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub owner: Option<String>,
}

impl ListFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        match &self.owner {
            Some(owner) => doc.owner_username == *owner,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: ListFilter,
    pub page: PageRequest,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl ListQuery {
    /// Global listing, ordered by business date.
    pub fn global(page: PageRequest) -> Self {
        Self {
            filter: ListFilter::default(),
            page,
            sort: SortKey::EffectiveDate,
            order: SortOrder::Descending,
        }
    }

    /// Listing scoped to one owner, ordered by creation time.
    pub fn owner(owner: impl Into<String>, page: PageRequest) -> Self {
        Self {
            filter: ListFilter {
                owner: Some(owner.into()),
            },
            page,
            sort: SortKey::CreatedAt,
            order: SortOrder::Descending,
        }
    }
}

/// One page of results plus the metadata a caller needs to walk the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages
    }
}

/// Cuts the requested page out of an already ordered list.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_items = items.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let items: Vec<T> = items
        .into_iter()
        .skip(offset)
        .take(request.page_size() as usize)
        .collect();
    Page {
        items,
        page: request.page(),
        total_pages: total_pages(total_items, request.page_size()),
        total_items,
    }
}
