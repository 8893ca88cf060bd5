use serde::Serialize;

use super::ValidationError;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page number and page size requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Result<Self, ValidationError> {
        if page == 0 {
            return Err(ValidationError::OutOfRange {
                field: "page",
                min: 1,
                max: u32::MAX,
            });
        }
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(ValidationError::OutOfRange {
                field: "size",
                min: 1,
                max: MAX_PAGE_SIZE,
            });
        }
        Ok(Self { page, size })
    }

    /// Build from optional query values, falling back to the defaults.
    pub fn from_parts(page: Option<u32>, size: Option<u32>) -> Result<Self, ValidationError> {
        Self::new(page.unwrap_or(1), size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of an order-stable listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of records matching the filter across all pages
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total_u64 = u64::try_from(total).unwrap_or(0);
        let pages = total_u64.div_ceil(u64::from(request.size));
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
            pages: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = PageRequest::from_parts(None, None).unwrap();
        assert_eq!(request, PageRequest::default());
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 50);
    }

    #[test]
    fn test_offset() {
        let request = PageRequest::new(3, 20).unwrap();
        assert_eq!(request.offset(), 40);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn test_page_count() {
        let request = PageRequest::new(1, 10).unwrap();
        assert_eq!(Page::<()>::new(vec![], 0, request).pages, 0);
        assert_eq!(Page::<()>::new(vec![], 10, request).pages, 1);
        assert_eq!(Page::<()>::new(vec![], 11, request).pages, 2);
    }
}
