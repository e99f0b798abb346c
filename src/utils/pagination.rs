/// Clamped page/limit/skip triple for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub skip: u64,
}

/// Both knobs are clamped before the skip is derived, so a hostile
/// `page` or `limit` can never produce a negative offset.
pub fn page_window(page: Option<i64>, limit: Option<i64>) -> PageWindow {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    PageWindow {
        page,
        limit,
        skip: ((page - 1) * limit) as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_twenty() {
        let window = page_window(None, None);
        assert_eq!(window, PageWindow { page: 1, limit: 20, skip: 0 });
    }

    #[test]
    fn negative_limit_cannot_wrap_the_skip() {
        let window = page_window(Some(2), Some(-5));
        assert_eq!(window.limit, 1);
        assert_eq!(window.skip, 1);
    }

    #[test]
    fn page_and_limit_are_clamped() {
        let window = page_window(Some(-3), Some(500));
        assert_eq!(window.page, 1);
        assert_eq!(window.limit, 100);
        assert_eq!(window.skip, 0);
    }

    #[test]
    fn skip_counts_prior_pages() {
        let window = page_window(Some(3), Some(25));
        assert_eq!(window.skip, 50);
    }
}
