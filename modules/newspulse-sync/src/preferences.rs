use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, warn};

use newspulse_common::{Identity, Preferences};

use crate::error::Result;
use crate::lifecycle::{lock, Epoch};
use crate::notice::{Notice, NoticeSender};
use crate::traits::NewsGateway;
use crate::SyncError;

/// Lifecycle of the subscriber's preferences.
///
/// `Saving` carries both the draft being written and the prior state to
/// revert to, so a failed save settles back into the last good `Loaded`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PrefState {
    Unloaded,
    Loading,
    Loaded(Preferences),
    LoadFailed,
    Saving { prior: Preferences, draft: Preferences },
}

/// Loads, validates, and saves alert preferences for one identity at a time.
/// Saves queue FIFO behind each other; loads supersede anything in flight.
pub struct PreferenceController {
    gateway: Arc<dyn NewsGateway>,
    notices: NoticeSender,
    state: Mutex<PrefState>,
    save_lock: tokio::sync::Mutex<()>,
    epoch: Epoch,
}

impl PreferenceController {
    pub fn new(gateway: Arc<dyn NewsGateway>, notices: NoticeSender) -> Self {
        Self {
            gateway,
            notices,
            state: Mutex::new(PrefState::Unloaded),
            save_lock: tokio::sync::Mutex::new(()),
            epoch: Epoch::new(),
        }
    }

    /// Fetch stored preferences. A subscriber with none stored settles into
    /// `Loaded` with defaults: no categories, immediate, email.
    pub async fn load(&self, identity: &Identity) -> Result<()> {
        let ticket = self.epoch.advance();
        *lock(&self.state) = PrefState::Loading;

        let result = self.gateway.fetch_preferences(identity.as_str()).await;

        let mut state = lock(&self.state);
        if !self.epoch.is_current(ticket) {
            debug!(ticket, "Discarding superseded preference load");
            return Ok(());
        }
        match result {
            Ok(stored) => {
                let first_time = stored.is_none();
                let prefs = stored.unwrap_or_default();
                debug!(first_time, "Preferences loaded");
                *state = PrefState::Loaded(prefs);
                Ok(())
            }
            Err(err) => {
                *state = PrefState::LoadFailed;
                let err = SyncError::from(err);
                warn!(error = %err, "Preference load failed");
                self.notices.publish(Notice::PreferencesLoadFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Submit a draft. An empty category selection is rejected here, before
    /// any network traffic. On success the draft becomes the authoritative
    /// `Loaded` state; on failure the prior state is restored.
    pub async fn save(&self, identity: &Identity, draft: Preferences) -> Result<()> {
        if draft.categories.is_empty() {
            return Err(SyncError::Validation(
                "at least one category is required".to_string(),
            ));
        }

        let _guard = self.save_lock.lock().await;

        let ticket = self.epoch.stamp();
        let prior = {
            let mut state = lock(&self.state);
            match &*state {
                PrefState::Loaded(current) => {
                    let prior = current.clone();
                    *state = PrefState::Saving {
                        prior: prior.clone(),
                        draft: draft.clone(),
                    };
                    prior
                }
                _ => {
                    return Err(SyncError::Validation(
                        "preferences are not loaded".to_string(),
                    ))
                }
            }
        };

        let result = self.gateway.save_preferences(identity.as_str(), &draft).await;

        let mut state = lock(&self.state);
        if !self.epoch.is_current(ticket) {
            debug!("Dropping preference save resolution after teardown");
            return result.map_err(SyncError::from);
        }
        match result {
            Ok(()) => {
                debug!(categories = draft.categories.len(), "Preferences saved");
                *state = PrefState::Loaded(draft);
                self.notices.publish(Notice::PreferencesSaved);
                Ok(())
            }
            Err(err) => {
                *state = PrefState::Loaded(prior);
                let err = SyncError::from(err);
                warn!(error = %err, "Preference save failed, reverted");
                self.notices.publish(Notice::PreferencesSaveFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn state(&self) -> PrefState {
        lock(&self.state).clone()
    }

    /// The preferences a form would display right now: the loaded state, or
    /// the in-flight draft while a save is pending.
    pub fn preferences(&self) -> Option<Preferences> {
        match &*lock(&self.state) {
            PrefState::Loaded(prefs) => Some(prefs.clone()),
            PrefState::Saving { draft, .. } => Some(draft.clone()),
            _ => None,
        }
    }

    /// Back to `Unloaded`, dropping any in-flight resolution.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        self.epoch.advance();
        *state = PrefState::Unloaded;
    }
}
