//! Pagination arithmetic.
//!
//! A [`Paginator`] is computed once from a (total count, limit, offset)
//! triple and attached to the result set it annotates. It is pure data:
//! page numbers, the current item range, and one [`Page`] descriptor per
//! page. A zero total count yields a last page of 0 and an empty descriptor
//! list, which callers must treat as "no pages" rather than an error.

use crate::error::{QueryError, QueryResult};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Offsets and limits for one page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Page-navigation metadata for a paginated result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginator {
    total_results: u64,
    per_page: u64,
    current: u64,
    first: u64,
    last: u64,
    next: Option<u64>,
    previous: Option<u64>,
    current_range: RangeInclusive<u64>,
    pages: Vec<Page>,
}

impl Paginator {
    /// Compute page metadata. Fails with [`QueryError::InvalidPagination`]
    /// when `limit` is zero.
    pub fn new(total_results: u64, limit: u64, offset: u64) -> QueryResult<Self> {
        if limit == 0 {
            return Err(QueryError::invalid_pagination(
                "page size must be greater than zero",
            ));
        }

        let current = offset / limit + 1;
        // floor((count - 1) / limit) + 1, with the zero-count case handled
        // explicitly so unsigned division cannot wrap.
        let last = if total_results == 0 {
            0
        } else {
            (total_results - 1) / limit + 1
        };
        let next = (current < last).then_some(current + 1);
        let previous = (current > 1).then_some(current - 1);
        let current_range = (offset + 1)..=(offset + limit).min(total_results);
        let pages = (1..=last)
            .map(|page| Page {
                offset: (page - 1) * limit,
                limit,
                page,
                per_page: limit,
            })
            .collect();

        Ok(Self {
            total_results,
            per_page: limit,
            current,
            first: 1,
            last,
            next,
            previous,
            current_range,
            pages,
        })
    }

    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn first(&self) -> u64 {
        self.first
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn next(&self) -> Option<u64> {
        self.next
    }

    pub fn previous(&self) -> Option<u64> {
        self.previous
    }

    /// Inclusive 1-based range of item indices on the current page; empty
    /// when there are no results.
    pub fn current_range(&self) -> RangeInclusive<u64> {
        self.current_range.clone()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
}

impl std::ops::Deref for Paginator {
    type Target = [Page];

    fn deref(&self) -> &Self::Target {
        &self.pages
    }
}

impl<'a> IntoIterator for &'a Paginator {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}
