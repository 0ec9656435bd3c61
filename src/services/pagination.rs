use serde::Serialize;

/// Requested page, already clamped to sane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    /// `page` below 1 becomes 1; `per_page` is clamped to `[1, max_per_page]`
    /// and falls back to `default_per_page` when absent.
    pub fn new(
        page: Option<i64>,
        per_page: Option<i64>,
        default_per_page: usize,
        max_per_page: usize,
    ) -> Self {
        let max_per_page = max_per_page.max(1);
        let page = page.filter(|p| *p >= 1).unwrap_or(1) as usize;
        let per_page = match per_page {
            Some(n) if n < 1 => 1,
            Some(n) => (n as u64).min(max_per_page as u64) as usize,
            None => default_per_page.clamp(1, max_per_page),
        };
        Self { page, per_page }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: usize) -> Self {
        let total_pages = total.div_ceil(request.per_page);
        Self {
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

/// Slice one page out of `items`. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(request, items.len());
    let page = items
        .into_iter()
        .skip(request.offset())
        .take(request.per_page)
        .collect();
    (page, pagination)
}
