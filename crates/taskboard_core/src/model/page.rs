//! Offset pagination shared by list operations.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Requested window into an ordered result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum rows to return. `None` or `0` selects the default, values
    /// above the maximum are clamped.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Returns the limit actually used by the query.
    pub fn applied_limit(&self) -> u32 {
        match self.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(value) => value.min(MAX_PAGE_LIMIT),
        }
    }
}

/// One page of results plus the size of the full result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub applied_limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    /// Whether rows exist beyond this page.
    pub fn has_more(&self) -> bool {
        u64::from(self.offset) + (self.items.len() as u64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, PageRequest, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

    #[test]
    fn applied_limit_defaults_and_clamps() {
        assert_eq!(PageRequest::default().applied_limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(PageRequest::new(0, 0).applied_limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(PageRequest::new(7, 0).applied_limit(), 7);
        assert_eq!(PageRequest::new(5_000, 0).applied_limit(), MAX_PAGE_LIMIT);
    }

    #[test]
    fn has_more_compares_window_with_total() {
        let page = Page {
            items: vec![1, 2],
            total: 5,
            applied_limit: 2,
            offset: 2,
        };
        assert!(page.has_more());

        let last = Page {
            items: vec![5],
            total: 5,
            applied_limit: 2,
            offset: 4,
        };
        assert!(!last.has_more());
    }
}
