//! Pagination contract of list queries.
//!
//! The cursor is compared with `$gt` going forward and `$lt` in reverse
//! against the list's ordering field, and every page is capped at
//! [`MAX_PAGE_LIMIT`] whatever the client asks for.

use dg_01_document_store::{Filter, FindOptions, SortOrder};
use serde_json::Value;

/// Page size ceiling, also used when no usable limit is given.
pub const MAX_PAGE_LIMIT: i64 = 50;

/// One page of a list query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    /// Ordering-field value of the last entry already seen.
    pub offset: Option<Value>,
    pub reverse: bool,
    /// Requested page size. Missing or non-positive means the ceiling.
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn forward() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, offset: impl Into<Value>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Page size actually used, given the configured ceiling.
    pub fn effective_limit(&self, ceiling: i64) -> usize {
        let ceiling = ceiling.clamp(1, MAX_PAGE_LIMIT);
        let limit = match self.limit {
            Some(l) if l > 0 => l.min(ceiling),
            _ => ceiling,
        };
        limit as usize
    }

    /// `base` narrowed to entries after the cursor.
    pub fn filter(&self, base: Filter, ordering_field: &str) -> Filter {
        match &self.offset {
            None => base,
            Some(offset) if self.reverse => base.and(Filter::lt(ordering_field, offset.clone())),
            Some(offset) => base.and(Filter::gt(ordering_field, offset.clone())),
        }
    }

    pub fn options(&self, ordering_field: &str, ceiling: i64) -> FindOptions {
        let order = if self.reverse {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        };
        FindOptions::new()
            .sort_by(ordering_field, order)
            .limit(self.effective_limit(ceiling))
    }
}
