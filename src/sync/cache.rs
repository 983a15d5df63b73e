//! Keyed query cache with freshness tracking and per-key in-flight slots

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::policy::{Freshness, SyncPolicy};
use super::state::{FetchOrigin, QuerySnapshot, SyncState};
use crate::api::{CancelToken, PageRequest};

/// The single network call allowed per key at any time
#[derive(Debug, Clone)]
pub struct InFlight {
    pub generation: u64,
    pub cancel: CancelToken,
    pub origin: FetchOrigin,
}

/// Cache entry for one `PageRequest`
#[derive(Debug, Clone)]
pub struct QueryEntry {
    pub state: SyncState,
    /// Instant of the last successful fetch
    pub fetched_at: Option<Instant>,
    /// Instant of the last settle or cancellation, drives eviction
    pub updated_at: Instant,
    pub in_flight: Option<InFlight>,
}

impl QueryEntry {
    fn new(now: Instant) -> Self {
        Self {
            state: SyncState::Idle,
            fetched_at: None,
            updated_at: now,
            in_flight: None,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Freshness of the cached data, `None` when there is no data
    pub fn freshness(&self, now: Instant, policy: &SyncPolicy) -> Option<Freshness> {
        match (&self.state, self.fetched_at) {
            (SyncState::Success(_), Some(fetched_at)) => {
                Some(policy.freshness(now.saturating_duration_since(fetched_at)))
            }
            _ => None,
        }
    }

    pub fn snapshot(&self, request: PageRequest, revision: u64) -> QuerySnapshot {
        QuerySnapshot {
            request,
            state: self.state.clone(),
            is_fetching: self.is_fetching(),
            fetched_at: self.fetched_at,
            revision,
        }
    }
}

/// Query cache keyed by `PageRequest`
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<PageRequest, QueryEntry>,
    hits: u64,
    misses: u64,
    network_fetches: u64,
    /// Last revision handed out; never reset
    revision: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, request: &PageRequest) -> Option<&QueryEntry> {
        self.entries.get(request)
    }

    pub fn get_mut(&mut self, request: &PageRequest) -> Option<&mut QueryEntry> {
        self.entries.get_mut(request)
    }

    /// Entry for `request`, created idle if missing
    pub fn entry(&mut self, request: PageRequest, now: Instant) -> &mut QueryEntry {
        self.entries
            .entry(request)
            .or_insert_with(|| QueryEntry::new(now))
    }

    /// Snapshot of `request` stamped with the next revision
    pub fn snapshot(&mut self, request: PageRequest) -> QuerySnapshot {
        self.revision += 1;
        let revision = self.revision;
        match self.entries.get(&request) {
            Some(entry) => entry.snapshot(request, revision),
            None => QuerySnapshot {
                revision,
                ..QuerySnapshot::idle(request)
            },
        }
    }

    pub fn is_in_flight(&self, request: &PageRequest) -> bool {
        self.entries
            .get(request)
            .map_or(false, QueryEntry::is_fetching)
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_network_fetch(&mut self) {
        self.network_fetches += 1;
    }

    /// Drop settled entries whose last update is at least `retain_for` old.
    /// Entries with a fetch in flight are kept.
    pub fn evict_expired(&mut self, now: Instant, retain_for: Duration) -> Vec<PageRequest> {
        let expired: Vec<PageRequest> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                !entry.is_fetching() && now.saturating_duration_since(entry.updated_at) >= retain_for
            })
            .map(|(request, _)| *request)
            .collect();

        for request in &expired {
            self.entries.remove(request);
            trace!("Evicted expired cache entry: {}", request);
        }

        expired
    }

    /// Remove every entry, returning the in-flight fetches so the caller can
    /// cancel them
    pub fn clear(&mut self) -> Vec<InFlight> {
        debug!("Clearing query cache ({} entries)", self.entries.len());
        let in_flight = self
            .entries
            .drain()
            .filter_map(|(_, entry)| entry.in_flight)
            .collect();
        self.hits = 0;
        self.misses = 0;
        self.network_fetches = 0;
        in_flight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            in_flight: self.entries.values().filter(|e| e.is_fetching()).count(),
            hits: self.hits,
            misses: self.misses,
            network_fetches: self.network_fetches,
            hit_rate: self.hit_rate(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub hits: u64,
    pub misses: u64,
    pub network_fetches: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PageResult;
    use std::sync::Arc;

    fn success(total: u64) -> SyncState {
        SyncState::Success(Arc::new(PageResult {
            items: vec![],
            total,
        }))
    }

    #[test]
    fn test_entry_freshness() {
        let policy = SyncPolicy::default();
        let now = Instant::now();
        let mut cache = QueryCache::new();
        let request = PageRequest::new(1, 10);

        let entry = cache.entry(request, now);
        assert_eq!(entry.freshness(now, &policy), None);

        entry.state = success(30);
        entry.fetched_at = Some(now);
        assert_eq!(entry.freshness(now, &policy), Some(Freshness::Fresh));
        assert_eq!(
            entry.freshness(now + Duration::from_secs(180), &policy),
            Some(Freshness::Stale)
        );
    }

    #[test]
    fn test_snapshot_of_missing_entry_is_idle() {
        let mut cache = QueryCache::new();
        let request = PageRequest::new(2, 5);
        let first = cache.snapshot(request);
        assert!(first.same_state(&QuerySnapshot::idle(request)));

        let second = cache.snapshot(request);
        assert!(first.is_superseded_by(&second));
        assert!(!second.is_superseded_by(&first));
    }

    #[test]
    fn test_eviction_skips_in_flight_entries() {
        let now = Instant::now();
        let retain = Duration::from_secs(600);
        let mut cache = QueryCache::new();

        let settled = PageRequest::new(1, 10);
        let busy = PageRequest::new(2, 10);
        cache.entry(settled, now).state = success(20);
        cache.entry(busy, now).in_flight = Some(InFlight {
            generation: 1,
            cancel: CancelToken::new(),
            origin: FetchOrigin::Active,
        });

        assert!(cache.evict_expired(now + Duration::from_secs(599), retain).is_empty());

        let evicted = cache.evict_expired(now + retain, retain);
        assert_eq!(evicted, vec![settled]);
        assert!(cache.get(&settled).is_none());
        assert!(cache.is_in_flight(&busy));
    }

    #[test]
    fn test_clear_returns_in_flight_fetches() {
        let now = Instant::now();
        let mut cache = QueryCache::new();
        let token = CancelToken::new();
        cache.entry(PageRequest::new(1, 10), now).in_flight = Some(InFlight {
            generation: 7,
            cancel: token,
            origin: FetchOrigin::Prefetch,
        });
        cache.entry(PageRequest::new(2, 10), now);
        cache.record_hit();

        let in_flight = cache.clear();
        assert_eq!(in_flight.len(), 1);
        assert_eq!(in_flight[0].generation, 7);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_hit_rate() {
        let mut cache = QueryCache::new();
        assert_eq!(cache.hit_rate(), 0.0);
        cache.record_hit();
        cache.record_hit();
        cache.record_hit();
        cache.record_miss();
        assert_eq!(cache.hit_rate(), 0.75);
    }
}
