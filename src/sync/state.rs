//! Per-query synchronization state

use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

use crate::api::{FetchError, PageRequest, PageResult};

/// Failure surfaced to observers once the retry budget is exhausted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub error: FetchError,
    /// Attempts made, including the first one
    pub attempts: u32,
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts > 1 {
            write!(f, "{} (after {} attempts)", self.error, self.attempts)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

/// State of one `PageRequest` in the query cache
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Pending,
    Success(Arc<PageResult>),
    Error(ErrorInfo),
}

impl SyncState {
    pub fn data(&self) -> Option<&Arc<PageResult>> {
        match self {
            SyncState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            SyncState::Error(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SyncState::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Pending => "pending",
            SyncState::Success(_) => "success",
            SyncState::Error(_) => "error",
        }
    }
}

/// Who asked for a fetch; only affects logging and cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// The page the user is looking at
    Active,
    /// Eager load of the page after the active one
    Prefetch,
    /// Explicit retry
    Refetch,
    /// Awaited access outside the active view
    Direct,
}

/// What observers see on every transition of a query
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub request: PageRequest,
    pub state: SyncState,
    /// A network call for this key is in flight (initial or background)
    pub is_fetching: bool,
    pub fetched_at: Option<Instant>,
    /// Order in which snapshots were taken under the cache lock; listeners
    /// may run out of order, a higher revision is always the newer state
    pub revision: u64,
}

impl QuerySnapshot {
    pub fn idle(request: PageRequest) -> Self {
        Self {
            request,
            state: SyncState::Idle,
            is_fetching: false,
            fetched_at: None,
            revision: 0,
        }
    }

    /// Same state as `other`, ignoring when each snapshot was taken
    pub fn same_state(&self, other: &QuerySnapshot) -> bool {
        self.request == other.request
            && self.state == other.state
            && self.is_fetching == other.is_fetching
            && self.fetched_at == other.fetched_at
    }

    /// `other` was taken after this snapshot
    pub fn is_superseded_by(&self, other: &QuerySnapshot) -> bool {
        other.revision > self.revision
    }

    /// No data yet and a fetch is running
    pub fn is_loading(&self) -> bool {
        self.state.is_pending()
    }

    /// Cached data is being served while a background refetch runs
    pub fn is_refreshing(&self) -> bool {
        self.is_fetching && self.state.data().is_some()
    }
}
