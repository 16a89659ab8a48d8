use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use newspulse_common::{ArticleId, Identity};

use crate::error::Result;
use crate::lifecycle::{lock, Epoch, KeyedLocks};
use crate::notice::{Notice, NoticeSender};
use crate::traits::NewsGateway;
use crate::SyncError;

/// Bookmarked article ids for the signed-in subscriber, kept in lockstep
/// with the server by optimistic toggles.
///
/// Toggles on the same article queue FIFO behind each other; toggles on
/// different articles run concurrently. A reset (sign-out) or a wholesale
/// reload advances the epoch, so any toggle still in flight resolves without
/// touching state.
pub struct BookmarkTracker {
    gateway: Arc<dyn NewsGateway>,
    notices: NoticeSender,
    ids: Mutex<HashSet<ArticleId>>,
    pending: KeyedLocks<ArticleId>,
    epoch: Epoch,
}

impl BookmarkTracker {
    pub fn new(gateway: Arc<dyn NewsGateway>, notices: NoticeSender) -> Self {
        Self {
            gateway,
            notices,
            ids: Mutex::new(HashSet::new()),
            pending: KeyedLocks::new(),
            epoch: Epoch::new(),
        }
    }

    /// Replace the set with the server's copy for this identity.
    pub async fn load(&self, identity: &Identity) -> Result<()> {
        let ticket = self.epoch.advance();
        let result = self.gateway.fetch_bookmarks(identity.as_str()).await;

        let mut ids = lock(&self.ids);
        if !self.epoch.is_current(ticket) {
            debug!(ticket, "Discarding superseded bookmark load");
            return Ok(());
        }
        match result {
            Ok(fetched) => {
                debug!(count = fetched.len(), "Bookmarks loaded");
                *ids = fetched;
                // The replace invalidates any toggle stamped against the
                // previous set; its confirm or rollback no longer applies.
                self.epoch.advance();
                Ok(())
            }
            Err(err) => {
                let err = SyncError::from(err);
                warn!(error = %err, "Bookmark load failed");
                Err(err)
            }
        }
    }

    /// Flip membership for one article. The flip is applied synchronously,
    /// before the network call, and rolled back if the server rejects it.
    /// The returned boolean is the settled membership.
    pub async fn toggle(&self, identity: &Identity, id: &ArticleId) -> Result<bool> {
        let key = self.pending.entry(id);
        let _guard = key.lock().await;

        let ticket = self.epoch.stamp();
        let was = {
            let mut ids = lock(&self.ids);
            if ids.contains(id) {
                ids.remove(id);
                true
            } else {
                ids.insert(id.clone());
                false
            }
        };

        let result = self
            .gateway
            .toggle_feed_bookmark(identity.as_str(), id, was)
            .await;

        let mut ids = lock(&self.ids);
        if !self.epoch.is_current(ticket) {
            // Torn down or wholesale-reloaded mid-flight. The set no longer
            // belongs to this toggle, so neither confirm nor revert.
            debug!(article_id = %id, "Dropping bookmark resolution after teardown");
            return result.map_err(SyncError::from);
        }
        match result {
            Ok(now) => {
                debug!(article_id = %id, bookmarked = now, "Bookmark confirmed");
                Ok(now)
            }
            Err(err) => {
                if was {
                    ids.insert(id.clone());
                } else {
                    ids.remove(id);
                }
                let cause = err.to_string();
                warn!(article_id = %id, error = %cause, "Bookmark toggle failed, rolled back");
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

    pub fn is_bookmarked(&self, id: &ArticleId) -> bool {
        lock(&self.ids).contains(id)
    }

    pub fn bookmarked_ids(&self) -> HashSet<ArticleId> {
        lock(&self.ids).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.ids).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.ids).is_empty()
    }

    /// Drop everything for the current identity. In-flight toggles resolve
    /// against a dead epoch and leave the fresh state alone.
    pub fn reset(&self) {
        let mut ids = lock(&self.ids);
        self.epoch.advance();
        ids.clear();
        drop(ids);
        self.pending.clear();
    }
}
