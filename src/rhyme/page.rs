// --- File: src/rhyme/page.rs
use serde::Serialize;

/// Pagination metadata. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    pub fn new(page: usize, limit: usize, total_items: usize) -> Self {
        let current_page = page.max(1);
        let items_per_page = limit.max(1);
        let total_pages = total_items.div_ceil(items_per_page);
        Self {
            current_page,
            total_pages,
            total_items,
            items_per_page,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }

    pub fn next_page(&self) -> Option<usize> {
        self.has_next.then_some(self.current_page + 1)
    }

    pub fn prev_page(&self) -> Option<usize> {
        self.has_prev.then_some(self.current_page - 1)
    }

    /// Offset of the first item of the current page.
    pub fn offset(&self) -> usize {
        (self.current_page - 1).saturating_mul(self.items_per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

/// Slices an already filtered list down to one page.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Page<T> {
    let info = PageInfo::new(page, limit, items.len());
    let items = items
        .into_iter()
        .skip(info.offset())
        .take(info.items_per_page)
        .collect();
    Page { items, info }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_of_twelve() {
        let page = paginate((1..=12).collect::<Vec<_>>(), 2, 5);
        assert_eq!(page.items, vec![6, 7, 8, 9, 10]);
        assert_eq!(page.info.total_pages, 3);
        assert!(page.info.has_next && page.info.has_prev);
        assert_eq!(page.info.next_page(), Some(3));
        assert_eq!(page.info.prev_page(), Some(1));
    }

    #[test]
    fn last_page_is_short() {
        let page = paginate((1..=12).collect::<Vec<_>>(), 3, 5);
        assert_eq!(page.items, vec![11, 12]);
        assert!(!page.info.has_next);
    }

    #[test]
    fn empty_and_out_of_range() {
        let empty = paginate(Vec::<u8>::new(), 1, 10);
        assert_eq!(empty.info.total_pages, 0);
        assert!(!empty.info.has_next && !empty.info.has_prev);

        let beyond = paginate(vec![1, 2, 3], 4, 2);
        assert!(beyond.items.is_empty());
        assert!(beyond.info.has_prev);

        let zero = paginate(vec![1, 2, 3], 0, 0);
        assert_eq!(zero.info.current_page, 1);
        assert_eq!(zero.items, vec![1]);
    }
}
