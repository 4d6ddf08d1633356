use serde::Serialize;

/// Pagination window over a known item count, consumed by list handlers
/// and fed into offset/count limits.
///
/// Pages are 1-based. When there are no items, or the requested page lies
/// past the last one, the window resets to page 1 with an empty slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub item_count: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    pub const DEFAULT_PAGE_SIZE: u64 = 10;

    pub fn new(item_count: u64, page_index: u64) -> Self {
        Self::with_size(item_count, page_index, Self::DEFAULT_PAGE_SIZE)
    }

    pub fn with_size(item_count: u64, page_index: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let page_index = page_index.max(1);
        let page_count = item_count / page_size + u64::from(item_count % page_size > 0);
        let (page_index, offset, limit) = if item_count == 0 || page_index > page_count {
            (1, 0, 0)
        } else {
            (page_index, page_size * (page_index - 1), page_size)
        };
        Self {
            item_count,
            page_index,
            page_size,
            page_count,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }
}
