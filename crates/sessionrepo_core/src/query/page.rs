//! Paging request and result types.
//!
//! # Invariants
//! - Page numbers are zero-based.
//! - `Page::content.len()` never exceeds `Page::size`.

use crate::query::sort::Sort;
use serde::{Deserialize, Serialize};

/// Request for one bounded slice of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    /// Zero-based page index.
    pub page: u64,
    /// Maximum number of elements on the page, at least 1.
    pub size: u64,
    #[serde(default)]
    pub sort: Sort,
}

impl Pageable {
    /// Creates an unsorted page request; `size` is raised to at least 1.
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.max(1),
            sort: Sort::unsorted(),
        }
    }

    pub fn first(size: u64) -> Self {
        Self::new(0, size)
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Number of elements skipped before this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            ..self.clone()
        }
    }
}

/// One page of results plus totals across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero-based page index.
    pub number: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Builds a page for `pageable`; `content` is truncated to the page size.
    pub fn new(mut content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let size = pageable.size.max(1);
        content.truncate(usize::try_from(size).unwrap_or(usize::MAX));
        Self {
            content,
            number: pageable.page,
            size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    /// Wraps a complete result as a single page.
    pub fn unpaged(content: Vec<T>) -> Self {
        let total = content.len() as u64;
        Self {
            content,
            number: 0,
            size: total,
            total_elements: total,
            total_pages: 1,
        }
    }

    pub fn empty(pageable: &Pageable) -> Self {
        Self::new(Vec::new(), pageable, 0)
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
