//! Page-number pagination for list pages.
//!
//! Page requests are forgiving: a page parameter that is not an integer yields the first
//! page, and one below 1 or past the end yields the last page.

/// Records shown per list page.
pub const PAGE_SIZE: usize = 10;

/// One page of a list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The records on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: usize,
    /// Total number of pages; at least 1, even for an empty list.
    pub num_pages: usize,
    /// Total number of records across all pages.
    pub count: usize,
}

impl<T> Page<T> {
    /// True when a page follows this one.
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// True when a page precedes this one.
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Every page number, `1..=num_pages`.
    pub fn page_range(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.num_pages
    }
}

/// Resolves a raw page parameter against the number of pages.
pub fn resolve_page(requested: Option<&str>, num_pages: usize) -> usize {
    let Some(requested) = requested else {
        return 1;
    };
    match requested.trim().parse::<i64>() {
        Err(_) => 1,
        Ok(n) if n < 1 || n as u64 > num_pages as u64 => num_pages,
        Ok(n) => n as usize,
    }
}

/// Cuts `items` into pages of `per_page` and returns the requested one.
pub fn paginate<T>(items: Vec<T>, per_page: usize, requested: Option<&str>) -> Page<T> {
    let per_page = per_page.max(1);
    let count = items.len();
    let num_pages = count.div_ceil(per_page).max(1);
    let number = resolve_page(requested, num_pages);
    let items = items
        .into_iter()
        .skip((number - 1) * per_page)
        .take(per_page)
        .collect();
    Page {
        items,
        number,
        num_pages,
        count,
    }
}
