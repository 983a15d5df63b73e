//! Query cache and synchronizer
//!
//! `SyncContext` is the explicit, constructed replacement for a global query
//! client. It owns the keyed cache of catalog pages, enforces at most one
//! in-flight fetch per `PageRequest`, serves cached data according to the
//! freshness/retention windows of its `SyncPolicy`, retries failed fetches,
//! cancels the previous active page when the active key changes, prefetches
//! the next page, and notifies subscribers on every state transition.
//!
//! Every fetch carries a generation number. A completing fetch only writes
//! its result when the entry still points at that generation, so a
//! superseded or cancelled request can never overwrite newer state.
//! Every snapshot is stamped with a revision under the cache lock, so a
//! subscriber can drop a notification that reaches it after a newer one.

pub mod cache;
pub mod policy;
pub mod state;

pub use cache::{CacheStats, QueryCache};
pub use policy::{Freshness, SyncPolicy};
pub use state::{ErrorInfo, FetchOrigin, QuerySnapshot, SyncState};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::api::{total_pages, CancelToken, FetchError, PageFetcher, PageRequest, PageResult};
use cache::InFlight;

/// Handle returned by `SyncContext::subscribe`
pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&QuerySnapshot) + Send + Sync>;

/// Shared query client for catalog pages
#[derive(Clone)]
pub struct SyncContext {
    shared: Arc<Shared>,
}

struct Shared {
    fetcher: Arc<dyn PageFetcher>,
    policy: SyncPolicy,
    inner: Mutex<SyncInner>,
}

#[derive(Default)]
struct SyncInner {
    cache: QueryCache,
    listeners: HashMap<PageRequest, Vec<(SubscriptionId, Listener)>>,
    next_subscription: SubscriptionId,
    next_generation: u64,
    active: Option<PageRequest>,
}

impl SyncInner {
    fn listeners_for(&self, request: PageRequest) -> Vec<Listener> {
        self.listeners
            .get(&request)
            .map(|list| list.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default()
    }

    /// Must be built under the lock right after the transition so the
    /// snapshot revision orders it against every other snapshot
    fn notification(&mut self, request: PageRequest) -> Notification {
        Notification {
            snapshot: self.cache.snapshot(request),
            listeners: self.listeners_for(request),
        }
    }
}

/// A transition to report once the cache lock has been released.
///
/// Deliveries from different tasks can interleave; subscribers order them
/// by `QuerySnapshot::revision`.
struct Notification {
    snapshot: QuerySnapshot,
    listeners: Vec<Listener>,
}

impl Notification {
    fn deliver(self) {
        trace!(
            "{} -> {} (fetching: {}) for {} listener(s)",
            self.snapshot.request,
            self.snapshot.state.label(),
            self.snapshot.is_fetching,
            self.listeners.len()
        );
        for listener in &self.listeners {
            listener(&self.snapshot);
        }
    }
}

fn deliver_all(notifications: Vec<Notification>) {
    for notification in notifications {
        notification.deliver();
    }
}

impl SyncContext {
    /// Create a context around a page source
    pub fn new(fetcher: Arc<dyn PageFetcher>, policy: SyncPolicy) -> Self {
        debug!("Creating sync context for {}", fetcher.source());
        Self {
            shared: Arc::new(Shared {
                fetcher,
                policy,
                inner: Mutex::new(SyncInner::default()),
            }),
        }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.shared.policy
    }

    pub fn source(&self) -> &str {
        self.shared.fetcher.source()
    }

    fn lock(&self) -> MutexGuard<'_, SyncInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The key of the page currently on screen
    pub fn active(&self) -> Option<PageRequest> {
        self.lock().active
    }

    /// Make `request` the active page and return its current snapshot.
    ///
    /// A fetch still running for the previously active page is cancelled.
    /// Fresh data is returned without a network call; stale data is returned
    /// while one background refetch runs; anything else starts a cold fetch.
    /// When the page has data and a next page exists, that page is
    /// prefetched.
    pub fn observe(&self, request: PageRequest) -> QuerySnapshot {
        let mut notifications = Vec::new();
        let snapshot = {
            let mut inner = self.lock();
            let previous = inner.active.replace(request);
            if let Some(previous) = previous.filter(|previous| *previous != request) {
                debug!("Active page changed: {} -> {}", previous, request);
                notifications.extend(self.cancel_locked(&mut inner, previous));
            }
            let (snapshot, started) = self.ensure_locked(&mut inner, request, FetchOrigin::Active, false);
            notifications.extend(started);
            snapshot
        };
        deliver_all(notifications);

        if let Some(data) = snapshot.state.data() {
            self.prefetch_after(request, data.total);
        }
        snapshot
    }

    /// Load `request` into the cache without making it active
    pub fn prefetch(&self, request: PageRequest) {
        let started = {
            let mut inner = self.lock();
            self.ensure_locked(&mut inner, request, FetchOrigin::Prefetch, false).1
        };
        if let Some(notification) = started {
            notification.deliver();
        }
    }

    /// Re-issue `request` regardless of freshness, unless it is already in
    /// flight. Used for explicit retries.
    pub fn refetch(&self, request: PageRequest) -> QuerySnapshot {
        let (snapshot, started) = {
            let mut inner = self.lock();
            self.ensure_locked(&mut inner, request, FetchOrigin::Refetch, true)
        };
        if let Some(notification) = started {
            notification.deliver();
        }
        snapshot
    }

    /// Wait for `request` to settle, sharing any fetch already in flight
    pub async fn fetch(&self, request: PageRequest) -> Result<Arc<PageResult>, ErrorInfo> {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let subscription = self.subscribe(request, move |snapshot| {
            let _ = sender.send(snapshot.clone());
        });

        let (initial, started) = {
            let mut inner = self.lock();
            self.ensure_locked(&mut inner, request, FetchOrigin::Direct, false)
        };
        if let Some(notification) = started {
            notification.deliver();
        }

        let mut snapshot = initial;
        let result = 'wait: loop {
            match &snapshot.state {
                SyncState::Success(data) => break Ok(Arc::clone(data)),
                SyncState::Error(info) if !snapshot.is_fetching => break Err(info.clone()),
                SyncState::Idle if !snapshot.is_fetching => break Err(aborted(0)),
                _ => {}
            }
            loop {
                match receiver.recv().await {
                    Some(next) if snapshot.is_superseded_by(&next) => {
                        snapshot = next;
                        break;
                    }
                    Some(_) => {}
                    None => break 'wait Err(aborted(0)),
                }
            }
        };

        self.unsubscribe(subscription);
        result
    }

    /// Current snapshot without triggering any fetch
    pub fn snapshot(&self, request: PageRequest) -> QuerySnapshot {
        self.lock().cache.snapshot(request)
    }

    /// Cancel the in-flight fetch for `request`, if any
    pub fn cancel(&self, request: PageRequest) -> bool {
        let cancelled = {
            let mut inner = self.lock();
            self.cancel_locked(&mut inner, request)
        };
        match cancelled {
            Some(notification) => {
                notification.deliver();
                true
            }
            None => false,
        }
    }

    /// Register `callback` for every transition of `request`
    pub fn subscribe<F>(&self, request: PageRequest, callback: F) -> SubscriptionId
    where
        F: Fn(&QuerySnapshot) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner.next_subscription += 1;
        let id = inner.next_subscription;
        inner
            .listeners
            .entry(request)
            .or_default()
            .push((id, Arc::new(callback)));
        trace!("Subscription {} registered for {}", id, request);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let mut removed = false;
        inner.listeners.retain(|_, list| {
            let before = list.len();
            list.retain(|(subscription, _)| *subscription != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Cancel every fetch and drop all cached data and the active key.
    /// Subscriptions are kept.
    pub fn reset(&self) {
        let in_flight = {
            let mut inner = self.lock();
            inner.active = None;
            inner.cache.clear()
        };
        for fetch in &in_flight {
            fetch.cancel.cancel();
        }
        info!("Sync context reset ({} fetch(es) cancelled)", in_flight.len());
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().cache.stats()
    }

    fn prefetch_after(&self, request: PageRequest, total: u64) {
        if request.page < total_pages(total, request.limit) {
            self.prefetch(request.next());
        }
    }

    /// Serve `request` from cache or start a fetch for it
    fn ensure_locked(
        &self,
        inner: &mut SyncInner,
        request: PageRequest,
        origin: FetchOrigin,
        force: bool,
    ) -> (QuerySnapshot, Option<Notification>) {
        let now = Instant::now();
        let policy = &self.shared.policy;

        let evicted = inner.cache.evict_expired(now, policy.retain_for);
        if !evicted.is_empty() {
            debug!("Evicted {} expired page(s)", evicted.len());
        }

        let freshness = inner
            .cache
            .get(&request)
            .and_then(|entry| entry.freshness(now, policy));
        match freshness {
            Some(Freshness::Fresh) | Some(Freshness::Stale) => inner.cache.record_hit(),
            _ => inner.cache.record_miss(),
        }

        let needs_fetch = force || freshness != Some(Freshness::Fresh);
        if !needs_fetch || inner.cache.is_in_flight(&request) {
            return (inner.cache.snapshot(request), None);
        }

        let notification = self.start_fetch_locked(inner, request, origin, freshness, now);
        (notification.snapshot.clone(), Some(notification))
    }

    fn start_fetch_locked(
        &self,
        inner: &mut SyncInner,
        request: PageRequest,
        origin: FetchOrigin,
        freshness: Option<Freshness>,
        now: Instant,
    ) -> Notification {
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let cancel = CancelToken::new();

        let entry = inner.cache.entry(request, now);
        let keeps_data = matches!(freshness, Some(Freshness::Fresh) | Some(Freshness::Stale));
        if !keeps_data {
            entry.state = SyncState::Pending;
        }
        entry.in_flight = Some(InFlight {
            generation,
            cancel: cancel.clone(),
            origin,
        });
        inner.cache.record_network_fetch();

        if keeps_data {
            debug!("Revalidating {} in background ({:?}, generation {})", request, origin, generation);
        } else {
            debug!("Fetching {} ({:?}, generation {})", request, origin, generation);
        }

        let context = self.clone();
        tokio::spawn(async move {
            context.run_fetch(request, generation, cancel).await;
        });

        inner.notification(request)
    }

    fn cancel_locked(&self, inner: &mut SyncInner, request: PageRequest) -> Option<Notification> {
        let entry = inner.cache.get_mut(&request)?;
        let in_flight = entry.in_flight.take()?;
        in_flight.cancel.cancel();
        entry.updated_at = Instant::now();
        if entry.state.is_pending() {
            entry.state = SyncState::Idle;
        }
        debug!(
            "Cancelled {:?} fetch for {} (generation {})",
            in_flight.origin, request, in_flight.generation
        );
        Some(inner.notification(request))
    }

    /// Settle the fetch started under `generation`. A failed background
    /// refetch replaces cached data with `Error` on purpose: the page then
    /// shows the error and its retry instead of silently stale products.
    async fn run_fetch(self, request: PageRequest, generation: u64, cancel: CancelToken) {
        let outcome = self.fetch_with_retry(request, &cancel).await;
        let now = Instant::now();

        let (notification, prefetch_total) = {
            let mut inner = self.lock();
            let active = inner.active;
            let Some(entry) = inner.cache.get_mut(&request) else {
                debug!("Discarding result for {}: entry no longer cached", request);
                return;
            };
            if entry.in_flight.as_ref().map(|fetch| fetch.generation) != Some(generation) {
                debug!("Discarding superseded result for {} (generation {})", request, generation);
                return;
            }

            entry.in_flight = None;
            entry.updated_at = now;
            match outcome {
                Ok(page) => {
                    trace!("Loaded {} ({} of {} items)", request, page.items.len(), page.total);
                    entry.state = SyncState::Success(Arc::new(page));
                    entry.fetched_at = Some(now);
                }
                Err(info) if info.error.is_aborted() => {
                    debug!("Fetch for {} aborted", request);
                    if entry.state.is_pending() {
                        entry.state = SyncState::Idle;
                    }
                }
                Err(info) => {
                    warn!("Fetch for {} failed: {}", request, info);
                    entry.state = SyncState::Error(info);
                }
            }

            let prefetch_total = match &entry.state {
                SyncState::Success(data) if active == Some(request) => Some(data.total),
                _ => None,
            };
            (inner.notification(request), prefetch_total)
        };

        notification.deliver();
        if let Some(total) = prefetch_total {
            self.prefetch_after(request, total);
        }
    }

    async fn fetch_with_retry(
        &self,
        request: PageRequest,
        cancel: &CancelToken,
    ) -> Result<PageResult, ErrorInfo> {
        let policy = &self.shared.policy;
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(aborted(attempt));
            }
            attempt += 1;

            match self.shared.fetcher.fetch(request, cancel.clone()).await {
                Ok(page) => return Ok(page),
                Err(error) if !error.is_retryable() => {
                    return Err(ErrorInfo { error, attempts: attempt });
                }
                Err(error) if attempt < policy.max_attempts() => {
                    let delay = policy.retry_delay(attempt - 1);
                    warn!(
                        "Fetch for {} failed (attempt {}/{}): {}; retrying in {:?}",
                        request,
                        attempt,
                        policy.max_attempts(),
                        error,
                        delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(aborted(attempt)),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(error) => return Err(ErrorInfo { error, attempts: attempt }),
            }
        }
    }
}

fn aborted(attempts: u32) -> ErrorInfo {
    ErrorInfo {
        error: FetchError::Aborted,
        attempts,
    }
}
