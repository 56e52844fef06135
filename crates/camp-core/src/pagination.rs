//! Pagination types for list endpoints

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: i64 = 25;
pub const MAX_PER_PAGE: i64 = 200;

/// Pagination parameters (from query string)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self { page, per_page }.normalized()
    }

    /// Clamp page to >= 1 and per_page to 1..=200
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// SQL offset
    pub fn offset(&self) -> i64 {
        let n = self.normalized();
        (n.page - 1) * n.per_page
    }

    /// SQL limit
    pub fn limit(&self) -> i64 {
        self.normalized().per_page
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PaginationParams) -> Self {
        let params = params.normalized();
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.per_page <= 0 {
            return 0;
        }
        (self.total + self.per_page - 1) / self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params_clamp() {
        let params = PaginationParams::new(0, 5_000);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, MAX_PER_PAGE);
        assert_eq!(params.offset(), 0);

        let params = PaginationParams::new(3, 25);
        assert_eq!(params.offset(), 50);
        assert_eq!(params.limit(), 25);

        let raw = PaginationParams { page: -4, per_page: 0 };
        assert_eq!(raw.limit(), 1);
        assert_eq!(raw.offset(), 0);
    }

    #[test]
    fn test_page_math() {
        let page = Page::new(vec![1, 2, 3], 51, PaginationParams::new(2, 25));
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let last = Page::new(vec![51], 51, PaginationParams::new(3, 25));
        assert!(!last.has_next());

        let empty: Page<i32> = Page::new(vec![], 0, PaginationParams::default());
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
    }

    #[test]
    fn test_defaults_from_query() {
        let params: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, DEFAULT_PER_PAGE);
    }
}
