//! Outgoing list query derived from [`FilterState`].

use serde::Serialize;

use super::filter::FilterState;

/// Default number of books per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Normalized query for the catalog list endpoint.
///
/// Only non-empty predicates are present; serializes straight into URL
/// query parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BookQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    pub limit: u32,
    pub offset: u64,
}

impl BookQuery {
    /// Build the query for the current filters.
    ///
    /// `settled_title` is the debounced search text; the raw title held by
    /// `filters` never reaches the query.
    pub fn derive(filters: &FilterState, settled_title: &str, page_size: u32) -> Self {
        let limit = page_size.max(1);
        Self {
            title: non_empty(settled_title),
            genre: non_empty(filters.genre()),
            publisher: non_empty(filters.publisher()),
            author: non_empty(filters.author()),
            available: filters.availability().as_bool(),
            limit,
            offset: u64::from(filters.page() - 1) * u64::from(limit),
        }
    }

    /// 1-based page this query asks for.
    pub fn page(&self) -> u32 {
        let index = self.offset / u64::from(self.limit.max(1));
        u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1))
    }

    /// Same predicates and page size, ignoring which page is asked for.
    pub fn same_predicates(&self, other: &Self) -> bool {
        self.title == other.title
            && self.genre == other.genre
            && self.publisher == other.publisher
            && self.author == other.author
            && self.available == other.available
            && self.limit == other.limit
    }

    /// True when no predicate is set (only `limit`/`offset`).
    pub fn is_unfiltered(&self) -> bool {
        self.title.is_none()
            && self.genre.is_none()
            && self.publisher.is_none()
            && self.author.is_none()
            && self.available.is_none()
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
