//! Page-number pagination shared by every listing.

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// A 1-based page request with a bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp client-supplied values into a valid request.
    ///
    /// The page number is capped so that the row offset fits a signed
    /// 64-bit SQL `OFFSET`; such pages are always past the end anyway.
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let max_page = i64::MAX as u64 / page_size;
        Self {
            page: page.unwrap_or(1).clamp(1, max_page),
            page_size,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// Slice an already ordered, fully materialised list.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let start = usize::try_from(self.offset())
            .unwrap_or(usize::MAX)
            .min(items.len());
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        let end = start.saturating_add(limit).min(items.len());
        Page::new(items[start..end].to_vec(), items.len() as u64, *self)
    }
}

/// One page of results plus the total size of the listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            request,
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    /// Number of pages; an empty listing still has one (empty) page.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.request.page_size).max(1)
    }

    pub fn next_page(&self) -> Option<u64> {
        (self.request.page < self.total_pages()).then(|| self.request.page + 1)
    }

    pub fn previous_page(&self) -> Option<u64> {
        (self.request.page > 1).then(|| (self.request.page - 1).min(self.total_pages()))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_clamped() {
        let req = PageRequest::new(Some(0), Some(1000));
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);

        let req = PageRequest::new(None, Some(0));
        assert_eq!(req.page_size, 1);
    }

    #[test]
    fn test_slice_and_links() {
        let items: Vec<u32> = (0..25).collect();
        let page = PageRequest::new(Some(2), Some(10)).slice(&items);

        assert_eq!(page.items, (10..20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.next_page(), Some(3));
        assert_eq!(page.previous_page(), Some(1));
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let items = vec![1, 2, 3];
        let page = PageRequest::new(Some(5), Some(10)).slice(&items);

        assert!(page.items.is_empty());
        assert_eq!(page.next_page(), None);
        assert_eq!(page.previous_page(), Some(1));
    }

    #[test]
    fn test_huge_page_number_does_not_overflow() {
        let req = PageRequest::new(Some(u64::MAX), Some(MAX_PAGE_SIZE));
        assert!(req.offset() <= i64::MAX as u64);

        let items = vec![1, 2, 3];
        let page = req.slice(&items);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.next_page(), None);
        assert_eq!(page.previous_page(), Some(1));
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page: Page<u8> = Page::empty(PageRequest::default());
        assert_eq!(page.total_pages(), 1);
        assert_eq!(page.next_page(), None);
    }
}
