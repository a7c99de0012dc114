//! Paginator - windowing descriptor for listings.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Zero-based page of `per_page` records.
///
/// `per_page == 0` means "no pagination": the whole listing is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    #[serde(default)]
    pub page: usize,
    #[serde(default, rename = "requestsPerPage")]
    pub per_page: usize,
}

impl Paginator {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Positions `[page * per_page, (page + 1) * per_page)` in listing order,
    /// or `None` when every record is wanted.
    pub fn window(&self) -> Option<Range<usize>> {
        if self.per_page == 0 {
            return None;
        }
        let start = self.page.saturating_mul(self.per_page);
        Some(start..start.saturating_add(self.per_page))
    }
}

/// Window for an optional paginator; `None` means everything.
pub fn window_of(paginator: Option<&Paginator>) -> Option<Range<usize>> {
    paginator.and_then(Paginator::window)
}
