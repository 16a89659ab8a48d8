use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use newspulse_common::{AlertRecord, ArticleId, Identity};

use crate::error::Result;
use crate::filter::{self, FilterState};
use crate::lifecycle::{lock, Epoch, KeyedLocks, LoadState};
use crate::notice::{Notice, NoticeSender};
use crate::traits::NewsGateway;
use crate::SyncError;

/// Delivered-alert history for the signed-in subscriber. Records are created
/// and deleted only server-side; locally we read them, flip their bookmark
/// flags, and keep two pieces of view state: a single expanded record and a
/// session-local read set.
pub struct AlertArchive {
    gateway: Arc<dyn NewsGateway>,
    notices: NoticeSender,
    state: Mutex<ArchiveState>,
    pending: KeyedLocks<ArticleId>,
    epoch: Epoch,
}

#[derive(Default)]
struct ArchiveState {
    items: Vec<AlertRecord>,
    load_state: LoadState,
    expanded: Option<ArticleId>,
    read: HashSet<ArticleId>,
}

impl AlertArchive {
    pub fn new(gateway: Arc<dyn NewsGateway>, notices: NoticeSender) -> Self {
        Self {
            gateway,
            notices,
            state: Mutex::new(ArchiveState::default()),
            pending: KeyedLocks::new(),
            epoch: Epoch::new(),
        }
    }

    /// Replace the history with the server's copy for this identity.
    pub async fn load(&self, identity: &Identity) -> Result<()> {
        let ticket = self.epoch.advance();
        {
            let mut state = lock(&self.state);
            state.load_state = LoadState::Loading;
        }

        let result = self.gateway.fetch_alerts(identity.as_str()).await;

        let mut state = lock(&self.state);
        if !self.epoch.is_current(ticket) {
            debug!(ticket, "Discarding superseded alert load");
            return Ok(());
        }
        match result {
            Ok(items) => {
                debug!(count = items.len(), "Alert history loaded");
                state.items = items;
                state.load_state = LoadState::Loaded;
                // The replace invalidates any bookmark mutation stamped
                // against the previous records.
                self.epoch.advance();
                Ok(())
            }
            Err(err) => {
                state.load_state = LoadState::Failed;
                let err = SyncError::from(err);
                warn!(error = %err, "Alert load failed");
                self.notices.publish(Notice::AlertsLoadFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load_state
    }

    /// Snapshot of the loaded records, unfiltered.
    pub fn items(&self) -> Vec<AlertRecord> {
        lock(&self.state).items.clone()
    }

    /// Projection through a view filter, same match rule as the feed.
    pub fn visible(&self, filter: &FilterState) -> Vec<AlertRecord> {
        let state = lock(&self.state);
        state
            .items
            .iter()
            .filter(|r| filter::matches(filter, r.category, &r.title, r.description.as_deref()))
            .cloned()
            .collect()
    }

    /// Expand one record's detail view, collapsing any other. Expanding an
    /// already-expanded record collapses it. Expanding marks the record read.
    pub fn expand(&self, id: &ArticleId) {
        let mut state = lock(&self.state);
        if state.expanded.as_ref() == Some(id) {
            state.expanded = None;
        } else {
            state.expanded = Some(id.clone());
            state.read.insert(id.clone());
        }
    }

    pub fn collapse(&self) {
        lock(&self.state).expanded = None;
    }

    pub fn expanded(&self) -> Option<ArticleId> {
        lock(&self.state).expanded.clone()
    }

    pub fn mark_read(&self, id: &ArticleId) {
        lock(&self.state).read.insert(id.clone());
    }

    /// Alerts not yet expanded or marked read this session. Read state is
    /// local only; the backend does not track it.
    pub fn unread_count(&self) -> usize {
        let state = lock(&self.state);
        state
            .items
            .iter()
            .filter(|r| !state.read.contains(&r.id))
            .count()
    }

    /// Set one record's bookmark flag: flip locally, confirm with the
    /// server, and settle on the server's answer. Same-record calls queue
    /// FIFO; a call whose flag already matches is a no-op.
    pub async fn set_bookmark(
        &self,
        identity: &Identity,
        id: &ArticleId,
        desired: bool,
    ) -> Result<bool> {
        let key = self.pending.entry(id);
        let _guard = key.lock().await;

        let ticket = self.epoch.stamp();
        let prior = {
            let mut state = lock(&self.state);
            let Some(record) = state.items.iter_mut().find(|r| &r.id == id) else {
                return Err(SyncError::Validation(format!("unknown alert {id}")));
            };
            if record.bookmarked == desired {
                return Ok(desired);
            }
            let prior = record.bookmarked;
            record.bookmarked = desired;
            prior
        };

        let result = self.gateway.toggle_alert_bookmark(identity.as_str(), id).await;

        let mut state = lock(&self.state);
        if !self.epoch.is_current(ticket) {
            debug!(alert_id = %id, "Dropping alert bookmark resolution after teardown");
            return result.map_err(SyncError::from);
        }
        match result {
            Ok(server_state) => {
                // The server's boolean wins, even over the optimistic flip.
                if let Some(record) = state.items.iter_mut().find(|r| &r.id == id) {
                    record.bookmarked = server_state;
                }
                debug!(alert_id = %id, bookmarked = server_state, "Alert bookmark confirmed");
                Ok(server_state)
            }
            Err(err) => {
                if let Some(record) = state.items.iter_mut().find(|r| &r.id == id) {
                    record.bookmarked = prior;
                }
                let cause = err.to_string();
                warn!(alert_id = %id, error = %cause, "Alert bookmark failed, rolled back");
                self.notices.publish(Notice::BookmarkFailed {
                    article_id: id.clone(),
                    error: cause.clone(),
                });
                Err(SyncError::BookmarkSync {
                    id: id.clone(),
                    cause,
                })
            }
        }
    }

    /// Drop everything for the current identity, including view state.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        self.epoch.advance();
        *state = ArchiveState::default();
        drop(state);
        self.pending.clear();
    }
}
