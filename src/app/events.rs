//! Application events delivered to the UI loop

use crate::api::PageRequest;
use crate::sync::QuerySnapshot;

/// Events raised outside the terminal input stream
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A watched query changed state
    SyncUpdated(QuerySnapshot),

    /// A non-fatal failure worth showing in the status bar
    Error { error: String },
}

impl AppEvent {
    /// The query this event refers to, if any
    pub fn request(&self) -> Option<PageRequest> {
        match self {
            AppEvent::SyncUpdated(snapshot) => Some(snapshot.request),
            AppEvent::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AppEvent::Error { .. })
    }
}
