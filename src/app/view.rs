//! View model consumed by the presentation layer

use serde::Serialize;

use crate::api::{PageRequest, Product};
use crate::pagination::MetaView;
use crate::sync::{ErrorInfo, QuerySnapshot};

/// Everything a renderer needs for one frame of the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub products: Vec<Product>,
    /// No data yet and the first fetch is running
    pub is_loading: bool,
    /// Any network call for the active page is running
    pub is_fetching: bool,
    pub is_error: bool,
    #[serde(skip)]
    pub error: Option<ErrorInfo>,
    pub page: u32,
    pub limit: u32,
    pub effective_total_pages: u32,
    pub effective_total: u64,
    /// Totals are frozen from an earlier successful page
    pub is_stale: bool,
}

impl PageView {
    pub fn new(request: PageRequest, snapshot: &QuerySnapshot, meta: MetaView) -> Self {
        let error = snapshot.state.error().cloned();
        Self {
            products: snapshot
                .state
                .data()
                .map(|data| data.items.clone())
                .unwrap_or_default(),
            is_loading: snapshot.is_loading(),
            is_fetching: snapshot.is_fetching,
            is_error: error.is_some(),
            error,
            page: request.page,
            limit: request.limit,
            effective_total_pages: meta.meta.total_pages,
            effective_total: meta.meta.total,
            is_stale: meta.stale,
        }
    }

    /// Navigation and page-size controls are inert; retry stays available
    pub fn controls_disabled(&self) -> bool {
        self.is_loading || self.is_fetching || self.is_error
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.effective_total_pages
    }

    /// 1-based positions of the first and last product shown
    pub fn item_range(&self) -> Option<(u64, u64)> {
        if self.products.is_empty() {
            return None;
        }
        let first = u64::from(self.page - 1) * u64::from(self.limit) + 1;
        Some((first, first + self.products.len() as u64 - 1))
    }
}
