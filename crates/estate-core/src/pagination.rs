//! Page-window arithmetic and page-control generation for listing grids.

use std::ops::Range;

/// Cards per page in the history and favorites grids.
pub const PAGE_SIZE: usize = 4;

/// Up to this many pages every page number is rendered.
const MAX_UNCOLLAPSED_PAGES: usize = 7;

/// `ceil(total_items / page_size)`; zero when there are no items.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// Index range of `page` (1-indexed) clipped to `total_items`.
///
/// Pages past the end produce an empty range.
pub fn page_range(page: usize, page_size: usize, total_items: usize) -> Range<usize> {
    let page = page.max(1);
    let start = ((page - 1) * page_size).min(total_items);
    let end = (page * page_size).min(total_items);
    start..end
}

/// The items shown on `page`.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    &items[page_range(page, page_size, items.len())]
}

/// One entry in the row of page buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Page(usize),
    Ellipsis,
}

/// Page buttons for `current` out of `total` pages.
///
/// With at most seven pages every page is listed. Otherwise the first and
/// last page are always present, with the current page and its neighbours
/// in between, and an ellipsis wherever pages are skipped.
pub fn page_controls(current: usize, total: usize) -> Vec<PageControl> {
    if total <= MAX_UNCOLLAPSED_PAGES {
        return (1..=total).map(PageControl::Page).collect();
    }

    let mut controls = vec![PageControl::Page(1)];
    if current > 3 {
        controls.push(PageControl::Ellipsis);
    }

    let start = current.saturating_sub(1).max(2);
    let end = (current + 1).min(total - 1);
    controls.extend((start..=end).map(PageControl::Page));

    if current + 2 < total {
        controls.push(PageControl::Ellipsis);
    }
    controls.push(PageControl::Page(total));
    controls
}

/// Current page of one paginated view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: usize,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl PageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Moves to `page` if it lies in `1..=total_pages`; page 1 is always
    /// accepted. Returns whether the cursor moved.
    pub fn go_to(&mut self, page: usize, total_pages: usize) -> bool {
        if page == 1 || (page >= 1 && page <= total_pages) {
            self.page = page;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Pulls the cursor back onto the last page after the list shrank.
    pub fn clamp(&mut self, total_pages: usize) {
        if self.page > total_pages {
            self.page = total_pages.max(1);
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self, total_pages: usize) -> bool {
        self.page < total_pages
    }
}
