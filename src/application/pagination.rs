//! Page-number pagination shared by every feed.
//!
//! Requested page numbers never fail: anything below the first page resolves
//! to page 1, anything past the end resolves to the last page, and unparsable
//! input resolves to page 1. An empty sequence still has exactly one (empty)
//! page.

use std::num::NonZeroU32;

use serde::Serialize;
use yatube_api_types::PageView;

pub const DEFAULT_PAGE_SIZE: NonZeroU32 = match NonZeroU32::new(10) {
    Some(size) => size,
    None => unreachable!(),
};

/// Offset/limit slice of an ordered sequence, as handed to repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u32,
}

/// Splits a sequence of `total` items into pages of `page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: u64,
    page_size: NonZeroU32,
}

impl Paginator {
    pub fn new(total: u64, page_size: NonZeroU32) -> Self {
        Self { total, page_size }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    /// Number of pages; at least one even when the sequence is empty.
    pub fn num_pages(&self) -> u32 {
        let size = u64::from(self.page_size.get());
        let pages = self.total.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Resolve a requested page number to a valid, in-range one.
    pub fn clamp(&self, requested: i64) -> u32 {
        let last = i64::from(self.num_pages());
        let number = requested.clamp(1, last);
        u32::try_from(number).unwrap_or(1)
    }

    /// Window for an already clamped page number.
    pub fn window(&self, number: u32) -> PageWindow {
        let size = self.page_size.get();
        PageWindow {
            offset: u64::from(number.saturating_sub(1)) * u64::from(size),
            limit: size,
        }
    }

    /// Assemble a page from items fetched for `number`'s window.
    pub fn page<T>(&self, number: u32, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(),
            total: self.total,
            page_size: self.page_size.get(),
        }
    }
}

/// Slice an in-memory sequence into the requested page.
pub fn paginate<T>(sequence: Vec<T>, page_size: NonZeroU32, requested: i64) -> Page<T> {
    let paginator = Paginator::new(sequence.len() as u64, page_size);
    let number = paginator.clamp(requested);
    let window = paginator.window(number);
    let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
    let items = sequence
        .into_iter()
        .skip(offset)
        .take(window.limit as usize)
        .collect();
    paginator.page(number, items)
}

/// Parse a raw `?page=` value; missing or non-numeric input means page 1.
pub fn parse_page_number(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }

    /// 1-based index of the first item on this page, or 0 when the page is empty.
    pub fn start_index(&self) -> u64 {
        if self.items.is_empty() {
            return 0;
        }
        u64::from(self.number - 1) * u64::from(self.page_size) + 1
    }

    pub fn to_view<U>(&self, f: impl FnMut(&T) -> U) -> PageView<U> {
        PageView {
            items: self.items.iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            next_page_number: self.next_page_number(),
            previous_page_number: self.previous_page_number(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero page size")
    }

    #[test]
    fn twenty_five_items_make_three_pages() {
        let items: Vec<u32> = (1..=25).collect();

        let first = paginate(items.clone(), size(10), 1);
        let second = paginate(items.clone(), size(10), 2);
        let third = paginate(items, size(10), 3);

        assert_eq!(first.num_pages, 3);
        assert_eq!(first.items.len(), 10);
        assert_eq!(second.items.len(), 10);
        assert_eq!(third.items.len(), 5);
        assert_eq!(third.items, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn out_of_range_requests_clamp() {
        let items: Vec<u32> = (1..=25).collect();

        let low = paginate(items.clone(), size(10), 0);
        let negative = paginate(items.clone(), size(10), -4);
        let high = paginate(items, size(10), 99);

        assert_eq!(low.number, 1);
        assert_eq!(negative.number, 1);
        assert_eq!(high.number, 3);
        assert_eq!(high.items.len(), 5);
    }

    #[test]
    fn empty_sequence_has_one_empty_page() {
        let page = paginate(Vec::<u32>::new(), size(10), 5);

        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next());
        assert!(!page.has_previous());
        assert_eq!(page.start_index(), 0);
    }

    #[test]
    fn navigation_flags_follow_position() {
        let items: Vec<u32> = (1..=25).collect();
        let middle = paginate(items, size(10), 2);

        assert!(middle.has_next());
        assert!(middle.has_previous());
        assert_eq!(middle.next_page_number(), Some(3));
        assert_eq!(middle.previous_page_number(), Some(1));
        assert_eq!(middle.start_index(), 11);
    }

    #[test]
    fn exact_multiple_does_not_add_trailing_page() {
        let paginator = Paginator::new(20, size(10));
        assert_eq!(paginator.num_pages(), 2);
        assert_eq!(
            paginator.window(2),
            PageWindow {
                offset: 10,
                limit: 10
            }
        );
    }

    #[test]
    fn parse_page_number_defaults_to_first_page() {
        assert_eq!(parse_page_number(None), 1);
        assert_eq!(parse_page_number(Some("abc")), 1);
        assert_eq!(parse_page_number(Some(" 3 ")), 3);
        assert_eq!(parse_page_number(Some("-2")), -2);
    }

    #[test]
    fn to_view_carries_navigation() {
        let page = paginate((1..=15).collect::<Vec<u32>>(), size(10), 2);
        let view = page.to_view(|n| n * 2);

        assert_eq!(view.items, vec![22, 24, 26, 28, 30]);
        assert!(!view.has_next);
        assert_eq!(view.previous_page_number, Some(1));
    }
}
