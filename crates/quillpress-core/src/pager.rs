//! Pagination arithmetic.

use serde::Serialize;

use crate::link::{fill_placeholder, format_index_html};

/// Placeholder key for the page number in link layouts (`{{ page }}`).
pub const PAGE_PLACEHOLDER: &str = "page";

/// Page size and total count for one paginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    per_page: usize,
    total: usize,
    pages: usize,
}

impl Pager {
    /// Create a pager. A zero page size yields zero pages.
    #[must_use]
    pub fn new(per_page: usize, total: usize) -> Self {
        let pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            per_page,
            total,
            pages,
        }
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages
    }

    #[must_use]
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Window for the 1-indexed page `current`, with links built from `layout`.
    ///
    /// Returns `None` for page 0 or when the page would start past the end.
    #[must_use]
    pub fn page(&self, current: usize, layout: &str) -> Option<PagerItem> {
        if current < 1 || self.per_page == 0 {
            return None;
        }
        let begin = (current - 1) * self.per_page;
        if begin > self.total {
            return None;
        }

        let mut end = begin + self.per_page;
        let mut next = current + 1;
        if end >= self.total {
            end = self.total;
            next = 0;
        }

        let mut item = PagerItem {
            current,
            begin,
            end,
            prev: current - 1,
            next,
            page_count: self.pages,
            total: self.total,
            has_prev: current > 1,
            has_next: next > 0,
            is_first: current == 1,
            link: String::new(),
            local_file: String::new(),
            prev_link: String::new(),
            next_link: String::new(),
            layout: layout.to_string(),
        };
        item.link = item.link_for(current);
        item.local_file = format_index_html(&item.link);
        item.prev_link = item.link_back(1);
        item.next_link = item.link_forward(1);
        Some(item)
    }

    /// The slice of `items` covered by `page`.
    pub fn slice<'a, T>(&self, items: &'a [T], page: &PagerItem) -> &'a [T] {
        let end = page.end.min(items.len());
        let begin = page.begin.min(end);
        &items[begin..end]
    }
}

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerItem {
    /// 1-indexed page number.
    pub current: usize,
    /// First item index, inclusive.
    pub begin: usize,
    /// Last item index, exclusive.
    pub end: usize,
    /// Previous page number, 0 when there is none.
    pub prev: usize,
    /// Next page number, 0 when there is none.
    pub next: usize,
    pub page_count: usize,
    pub total: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub is_first: bool,
    pub link: String,
    pub local_file: String,
    pub prev_link: String,
    pub next_link: String,
    #[serde(skip)]
    layout: String,
}

impl PagerItem {
    /// Link `offset` pages back, or this page's link when there is no previous page.
    #[must_use]
    pub fn link_back(&self, offset: usize) -> String {
        if !self.has_prev {
            return self.link.clone();
        }
        let target = self.current.saturating_sub(offset.max(1)).max(1);
        self.link_for(target)
    }

    /// Link `offset` pages forward, or this page's link when there is no next page.
    #[must_use]
    pub fn link_forward(&self, offset: usize) -> String {
        if !self.has_next {
            return self.link.clone();
        }
        self.link_for(self.current + offset.max(1))
    }

    fn link_for(&self, page: usize) -> String {
        fill_placeholder(&self.layout, PAGE_PLACEHOLDER, &page.to_string())
    }
}
