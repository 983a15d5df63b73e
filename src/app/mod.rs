//! Catalog browsing logic
//!
//! This module provides `CatalogBrowser`, which coordinates the pagination
//! controller, the stale-meta reconciler and the shared `SyncContext`, turns
//! user intents into page requests, and exposes a `PageView` for renderers.

mod events;
mod view;

pub use events::*;
pub use view::*;

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::api::PageRequest;
use crate::pagination::{MetaReconciler, MetaView, PaginationController, PaginationError};
use crate::sync::{QuerySnapshot, SubscriptionId, SyncContext};

/// State of the catalog screen
pub struct CatalogBrowser {
    sync: SyncContext,
    pagination: PaginationController,
    meta: MetaReconciler,
    meta_view: MetaView,
    snapshot: QuerySnapshot,
    subscription: Option<(PageRequest, SubscriptionId)>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl CatalogBrowser {
    /// Create a browser positioned at the controller's current page.
    ///
    /// Snapshots of the watched page are sent to `event_tx` as
    /// `AppEvent::SyncUpdated` and must be fed back through `apply_snapshot`.
    pub fn new(
        sync: SyncContext,
        pagination: PaginationController,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let snapshot = QuerySnapshot::idle(pagination.request());
        Self {
            sync,
            pagination,
            meta: MetaReconciler::new(),
            meta_view: MetaView::default(),
            snapshot,
            subscription: None,
            event_tx,
        }
    }

    /// Start loading the current page
    pub fn open(&mut self) {
        info!("Opening catalog at {} from {}", self.request(), self.sync.source());
        self.show_current();
    }

    pub fn sync(&self) -> &SyncContext {
        &self.sync
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub fn request(&self) -> PageRequest {
        self.pagination.request()
    }

    pub fn view(&self) -> PageView {
        PageView::new(self.request(), &self.snapshot, self.meta_view)
    }

    /// Latest snapshot of the current page
    pub fn snapshot(&self) -> &QuerySnapshot {
        &self.snapshot
    }

    pub fn controls_disabled(&self) -> bool {
        self.view().controls_disabled()
    }

    fn total_pages(&self) -> u32 {
        self.meta_view.meta.total_pages
    }

    /// Jump to `target`, clamped to the known page range
    pub fn go_to_page(&mut self, target: i64) -> bool {
        let total = self.total_pages();
        self.navigate(|pagination| pagination.go_to_page(target, total))
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.total_pages();
        self.navigate(|pagination| pagination.next_page(total))
    }

    pub fn previous_page(&mut self) -> bool {
        let total = self.total_pages();
        self.navigate(|pagination| pagination.previous_page(total))
    }

    pub fn first_page(&mut self) -> bool {
        let total = self.total_pages();
        self.navigate(|pagination| pagination.first_page(total))
    }

    pub fn last_page(&mut self) -> bool {
        let total = self.total_pages();
        self.navigate(|pagination| pagination.last_page(total))
    }

    fn navigate(&mut self, step: impl FnOnce(&mut PaginationController) -> bool) -> bool {
        if self.controls_disabled() {
            debug!("Ignoring navigation while {} is busy or failed", self.request());
            return false;
        }
        if !step(&mut self.pagination) {
            return false;
        }
        self.show_current();
        true
    }

    /// Change the page size. Returns `Ok(false)` when the controls are
    /// disabled or the size is unchanged.
    pub fn set_limit(&mut self, limit: u32) -> Result<bool, PaginationError> {
        if self.controls_disabled() || limit == self.pagination.limit() {
            return Ok(false);
        }
        self.pagination.set_limit(limit)?;
        self.show_current();
        Ok(true)
    }

    /// Move to the next larger or smaller page size
    pub fn step_limit(&mut self, larger: bool) -> Option<u32> {
        if self.controls_disabled() {
            return None;
        }
        let limit = self.pagination.step_limit(larger)?;
        self.show_current();
        Some(limit)
    }

    /// Re-issue the current request regardless of cached state
    pub fn retry(&mut self) {
        let request = self.request();
        info!("Retrying {}", request);
        self.watch(request);
        let snapshot = self.sync.refetch(request);
        self.apply_snapshot(snapshot);
    }

    /// Fold a snapshot into the view. Snapshots of other pages, and ones
    /// older than the snapshot already shown, are ignored. Returns whether
    /// the view changed.
    pub fn apply_snapshot(&mut self, snapshot: QuerySnapshot) -> bool {
        let request = self.request();
        if snapshot.request != request {
            trace!("Ignoring snapshot for {} while showing {}", snapshot.request, request);
            return false;
        }
        if !self.snapshot.is_superseded_by(&snapshot) {
            trace!(
                "Ignoring out-of-order snapshot for {} (revision {} <= {})",
                request,
                snapshot.revision,
                self.snapshot.revision
            );
            return false;
        }

        self.meta_view = self.meta.observe(&snapshot.state, request.limit);
        let changed = !snapshot.same_state(&self.snapshot);
        if changed {
            if let Some(info) = snapshot.state.error() {
                let _ = self.event_tx.send(AppEvent::Error {
                    error: format!("Failed to load {}: {}", request, info),
                });
            }
        }
        self.snapshot = snapshot;

        // a start page beyond the catalog is pulled back once totals are known
        let total = self.meta_view.meta.total_pages;
        if self.snapshot.state.data().is_some() && request.page > total {
            debug!("{} is past the last page ({}), clamping", request, total);
            if self.pagination.go_to_page(i64::from(total), total) {
                self.show_current();
            }
            return true;
        }
        changed
    }

    /// Observe the current request, moving the subscription with it
    fn show_current(&mut self) {
        let request = self.request();
        self.watch(request);
        let snapshot = self.sync.observe(request);
        self.apply_snapshot(snapshot);
    }

    fn watch(&mut self, request: PageRequest) {
        if matches!(self.subscription, Some((watched, _)) if watched == request) {
            return;
        }
        self.unwatch();

        let event_tx = self.event_tx.clone();
        let id = self.sync.subscribe(request, move |snapshot| {
            let _ = event_tx.send(AppEvent::SyncUpdated(snapshot.clone()));
        });
        self.subscription = Some((request, id));
    }

    fn unwatch(&mut self) {
        if let Some((request, id)) = self.subscription.take() {
            trace!("Dropping subscription {} for {}", id, request);
            self.sync.unsubscribe(id);
        }
    }
}

impl Drop for CatalogBrowser {
    fn drop(&mut self) {
        self.unwatch();
    }
}
