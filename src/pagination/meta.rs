//! Last known-good totals, kept stable across loading and error states

use crate::api::total_pages;
use crate::sync::SyncState;

/// Totals shown by the pagination controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveMeta {
    pub total: u64,
    pub total_pages: u32,
}

impl EffectiveMeta {
    pub fn from_total(total: u64, limit: u32) -> Self {
        Self {
            total,
            total_pages: total_pages(total, limit),
        }
    }
}

impl Default for EffectiveMeta {
    fn default() -> Self {
        Self {
            total: 0,
            total_pages: 1,
        }
    }
}

/// Meta to display, and whether it is a frozen value shown during an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaView {
    pub meta: EffectiveMeta,
    pub stale: bool,
}

/// Records the meta of every successful page and replays it while the
/// current query is loading or failed, so navigation does not collapse to a
/// single page.
#[derive(Debug, Clone, Default)]
pub struct MetaReconciler {
    last_ok: Option<EffectiveMeta>,
}

impl MetaReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meta for `state` of a query issued with `limit`
    pub fn observe(&mut self, state: &SyncState, limit: u32) -> MetaView {
        match state {
            SyncState::Success(data) => {
                let meta = EffectiveMeta::from_total(data.total, limit);
                self.last_ok = Some(meta);
                MetaView { meta, stale: false }
            }
            SyncState::Error(_) => MetaView {
                meta: self.last_known(limit),
                stale: true,
            },
            SyncState::Idle | SyncState::Pending => MetaView {
                meta: self.last_known(limit),
                stale: false,
            },
        }
    }

    /// Last successful meta, with the page count derived for `limit`
    pub fn last_known(&self, limit: u32) -> EffectiveMeta {
        self.last_ok
            .map(|meta| EffectiveMeta::from_total(meta.total, limit))
            .unwrap_or_default()
    }

    pub fn has_success(&self) -> bool {
        self.last_ok.is_some()
    }

    pub fn reset(&mut self) {
        self.last_ok = None;
    }
}
