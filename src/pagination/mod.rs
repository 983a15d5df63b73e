//! Pagination state for the catalog view.
//!
//! This module provides the controller that owns the current page and page
//! size, the windowed page-label layout used by the pagination bar, and the
//! reconciler that keeps the last known-good totals stable while a request
//! is loading or has failed.

pub mod controller;
pub mod meta;
pub mod window;

pub use controller::{PaginationController, PaginationError, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZES};
pub use meta::{EffectiveMeta, MetaReconciler, MetaView};
pub use window::{page_window, PageSlot, WindowMode};
