//! Page arithmetic for listings.
//!
//! Page numbers are 1-based. Requests outside the available range are clamped
//! onto the nearest existing page rather than rejected, and an empty listing
//! still has a single (empty) first page.

use serde::Serialize;

/// Number of articles shown per page in rubric listings.
pub const ARTICLES_PER_PAGE: i64 = 2;

/// One page of a listing together with the totals needed for navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_next(&self) -> bool { self.number < self.num_pages }

    #[must_use]
    pub const fn has_previous(&self) -> bool { self.number > 1 }
}

/// Resolved window of rows backing a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub offset: i64,
    pub limit: i64,
}

/// Clamp `requested` onto the pages available for `total` rows.
///
/// `per_page` values below one are treated as one.
#[must_use]
pub fn window(requested: i64, total: i64, per_page: i64) -> PageWindow {
    let per_page = per_page.max(1);
    let total = total.max(0);
    let num_pages = if total == 0 {
        1
    } else {
        total.div_euclid(per_page) + i64::from(total.rem_euclid(per_page) != 0)
    };
    let number = requested.clamp(1, num_pages);
    PageWindow {
        number,
        num_pages,
        offset: (number - 1) * per_page,
        limit: per_page,
    }
}

/// Interpret a raw `page` query parameter.
///
/// Missing or non-numeric values select the first page; numeric values are
/// passed through unchanged and clamped later by [`window`].
#[must_use]
pub fn parse_page(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(1)
}
