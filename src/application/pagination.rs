//! Offset pagination helpers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PER_PAGE: u32 = 15;
pub const MAX_PER_PAGE: u32 = 100;

/// A validated page window. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage(page));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(PaginationError::InvalidPageSize(per_page));
        }
        Ok(Self { page, per_page })
    }

    /// First page with the given size.
    pub fn first(per_page: u32) -> Result<Self, PaginationError> {
        Self::new(1, per_page)
    }

    /// Build from optional query parameters, clamping the size into range.
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of results plus length-aware metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let per_page = u64::from(request.per_page());
        let last_page = total.div_ceil(per_page).max(1);
        Self {
            items,
            total,
            per_page: request.per_page(),
            current_page: request.page(),
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
            last_page: self.last_page,
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Slice an in-memory, already ordered collection into a page.
pub fn paginate_slice<T: Clone>(items: &[T], request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let start = usize::try_from(request.offset())
        .unwrap_or(usize::MAX)
        .min(items.len());
    let end = start
        .saturating_add(request.per_page() as usize)
        .min(items.len());
    Page::new(items[start..end].to_vec(), total, request)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be at least 1 (got {0})")]
    InvalidPage(u32),
    #[error("page size must be between 1 and {max} (got {0})", max = MAX_PER_PAGE)]
    InvalidPageSize(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_rounds_up_and_never_drops_below_one() {
        let request = PageRequest::new(1, 15).expect("valid");
        assert_eq!(Page::<u8>::new(Vec::new(), 0, request).last_page, 1);
        assert_eq!(Page::<u8>::new(Vec::new(), 15, request).last_page, 1);
        assert_eq!(Page::<u8>::new(Vec::new(), 16, request).last_page, 2);
    }

    #[test]
    fn rejects_zero_page_and_size() {
        assert_eq!(
            PageRequest::new(0, 10),
            Err(PaginationError::InvalidPage(0))
        );
        assert_eq!(
            PageRequest::new(1, 0),
            Err(PaginationError::InvalidPageSize(0))
        );
    }

    #[test]
    fn query_values_are_clamped() {
        let request = PageRequest::from_query(Some(0), Some(500));
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), MAX_PER_PAGE);
        assert_eq!(PageRequest::from_query(None, None), PageRequest::default());
    }

    #[test]
    fn slices_requested_window() {
        let items: Vec<u32> = (1..=7).collect();
        let page = paginate_slice(&items, PageRequest::new(2, 3).expect("valid"));
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.last_page, 3);
        assert!(page.has_more());

        let beyond = paginate_slice(&items, PageRequest::new(5, 3).expect("valid"));
        assert!(beyond.items.is_empty());
    }
}
