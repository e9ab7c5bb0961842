//! Pagination arithmetic for the message inbox
//!
//! The calculator never clamps and never fails: a page past the end yields
//! an empty window. Callers that want a valid page use [`clamp_page`] first.

/// Row range to request from the gateway for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Zero-based index of the first row
    pub offset: u64,
    /// Number of rows to request (`[offset, offset + limit)`)
    pub limit: u64,
    /// `ceil(total_count / page_size)`, 0 when there are no rows
    pub total_pages: u64,
    /// Rows the gateway will actually return for this window
    pub rows_in_page: u64,
}

impl PageWindow {
    /// Exclusive end of the requested range
    pub fn end(&self) -> u64 {
        self.offset + self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.rows_in_page == 0
    }
}

/// Number of pages needed for `total_count` rows
///
/// `page_size` of 0 is treated as 1.
pub fn total_pages(total_count: u64, page_size: u32) -> u64 {
    let size = u64::from(page_size.max(1));
    total_count.div_ceil(size)
}

/// Compute the row window for a 1-indexed `page`
///
/// Page 0 is read as page 1.
///
/// # Examples
/// ```
/// use backstage_admin::pagination::page_window;
///
/// // 25 rows at 10 per page: the third page holds the last 5
/// let w = page_window(25, 10, 3);
/// assert_eq!(w.offset, 20);
/// assert_eq!(w.rows_in_page, 5);
/// assert_eq!(w.total_pages, 3);
///
/// // Past the end is not an error, just empty
/// let w = page_window(25, 10, 9);
/// assert!(w.is_empty());
/// ```
pub fn page_window(total_count: u64, page_size: u32, page: u32) -> PageWindow {
    let size = u64::from(page_size.max(1));
    let page = u64::from(page.max(1));
    let offset = (page - 1).saturating_mul(size);
    let rows_in_page = total_count.saturating_sub(offset).min(size);

    PageWindow {
        offset,
        limit: size,
        total_pages: total_pages(total_count, page_size),
        rows_in_page,
    }
}

/// Clamp a requested page into `[1, max(total_pages, 1)]`
pub fn clamp_page(page: u32, total_pages: u64) -> u32 {
    let last = u32::try_from(total_pages.max(1)).unwrap_or(u32::MAX);
    page.clamp(1, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_ceiling() {
        for (count, size, expected) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (25, 10, 3), (250, 100, 3)] {
            assert_eq!(total_pages(count, size), expected, "count={} size={}", count, size);
        }
    }

    #[test]
    fn test_total_pages_zero_iff_empty() {
        for count in 0..50u64 {
            for size in 1..12u32 {
                assert_eq!(total_pages(count, size) == 0, count == 0);
            }
        }
    }

    #[test]
    fn test_window_first_page() {
        let w = page_window(25, 10, 1);
        assert_eq!(w.offset, 0);
        assert_eq!(w.limit, 10);
        assert_eq!(w.end(), 10);
        assert_eq!(w.rows_in_page, 10);
    }

    #[test]
    fn test_window_last_partial_page() {
        let w = page_window(25, 10, 3);
        assert_eq!(w.offset, 20);
        assert_eq!(w.rows_in_page, 5);
        assert_eq!(w.total_pages, 3);
    }

    #[test]
    fn test_window_exact_boundary() {
        let w = page_window(20, 10, 2);
        assert_eq!(w.offset, 10);
        assert_eq!(w.rows_in_page, 10);
        assert_eq!(w.total_pages, 2);
    }

    #[test]
    fn test_window_out_of_range_is_empty_not_clamped() {
        let w = page_window(25, 10, 4);
        assert_eq!(w.offset, 30);
        assert!(w.is_empty());
        assert_eq!(w.total_pages, 3);
    }

    #[test]
    fn test_window_empty_collection() {
        let w = page_window(0, 10, 1);
        assert_eq!(w.offset, 0);
        assert_eq!(w.total_pages, 0);
        assert!(w.is_empty());
    }

    #[test]
    fn test_window_page_zero_reads_as_first() {
        assert_eq!(page_window(25, 10, 0), page_window(25, 10, 1));
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 3), 1);
        assert_eq!(clamp_page(2, 3), 2);
        assert_eq!(clamp_page(99, 3), 3);
        assert_eq!(clamp_page(5, 0), 1);
    }
}
