use serde::{Deserialize, Serialize};

/// Surrogate id of every persisted record (parents, children and catalog references).
pub type RecordId = i64;

/// One page of a listing, 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Slices an already filtered and sorted list into the requested page.
    pub fn from_sorted(items: Vec<T>, page: u32, size: u32) -> Self {
        let page = page.max(1);
        let size = size.max(1);

        let total = u64::try_from(items.len()).unwrap_or(u64::MAX);
        let total_pages = page_count(total, size);

        let offset = usize::try_from(page.saturating_sub(1)).unwrap_or(usize::MAX)
            .saturating_mul(usize::try_from(size).unwrap_or(usize::MAX));
        let items = items
            .into_iter()
            .skip(offset)
            .take(usize::try_from(size).unwrap_or(usize::MAX))
            .collect();

        Self {
            items,
            page,
            size,
            total,
            total_pages,
        }
    }
}

/// Number of pages needed for `total` items, saturating at `u32::MAX`.
fn page_count(total: u64, size: u32) -> u32 {
    u32::try_from(total.div_ceil(u64::from(size.max(1)))).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_slices_and_counts() {
        let page = Page::from_sorted((1..=7).collect::<Vec<_>>(), 2, 3);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn page_zero_is_clamped_to_first() {
        let page = Page::from_sorted(vec!["a", "b"], 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.size, 1);
        assert_eq!(page.items, vec!["a"]);
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let page = Page::<i32>::from_sorted(Vec::new(), 1, 20);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn page_count_saturates() {
        assert_eq!(page_count(u64::MAX, 1), u32::MAX);
        assert_eq!(page_count(u64::from(u32::MAX) + 1, 1), u32::MAX);
        assert_eq!(page_count(10, 4), 3);
    }
}
