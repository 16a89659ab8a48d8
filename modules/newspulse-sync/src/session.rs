use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use newspulse_common::{AlertRecord, Article, ArticleId, Category, Identity, Preferences};

use crate::archive::AlertArchive;
use crate::bookmarks::BookmarkTracker;
use crate::error::Result;
use crate::feed::ArticleStore;
use crate::filter::FilterState;
use crate::lifecycle::lock;
use crate::notice::{Notice, NoticeSender};
use crate::preferences::PreferenceController;
use crate::traits::NewsGateway;
use crate::SyncError;

/// The signed-in identity, if any. Absence is the logged-out state, not an
/// error. Only the hub's sign-in/sign-out paths mutate it; every other
/// component receives the identity as a read-only argument.
pub struct SessionContext {
    identity: Mutex<Option<Identity>>,
}

impl SessionContext {
    pub(crate) fn new() -> Self {
        Self {
            identity: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        lock(&self.identity).clone()
    }

    pub fn is_signed_in(&self) -> bool {
        lock(&self.identity).is_some()
    }

    pub(crate) fn set(&self, identity: Identity) {
        *lock(&self.identity) = Some(identity);
    }

    /// Clear the identity. Returns false if nobody was signed in.
    pub(crate) fn clear(&self) -> bool {
        lock(&self.identity).take().is_some()
    }
}

/// A feed article paired with its derived bookmark flag. The flag is always
/// a membership test against the tracker, never stored on the article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub article: Article,
    pub bookmarked: bool,
}

/// Owns one of each store plus the session, and fans identity changes out
/// to them. This is the single object a shell talks to.
pub struct SyncHub {
    session: SessionContext,
    feed: ArticleStore,
    bookmarks: BookmarkTracker,
    archive: AlertArchive,
    preferences: PreferenceController,
    notices: NoticeSender,
}

impl SyncHub {
    /// Build the hub and hand back the notice stream for the shell to drain.
    pub fn new(gateway: Arc<dyn NewsGateway>) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, rx) = NoticeSender::channel();
        let hub = Self {
            session: SessionContext::new(),
            feed: ArticleStore::new(gateway.clone(), notices.clone()),
            bookmarks: BookmarkTracker::new(gateway.clone(), notices.clone()),
            archive: AlertArchive::new(gateway.clone(), notices.clone()),
            preferences: PreferenceController::new(gateway, notices.clone()),
            notices,
        };
        (hub, rx)
    }

    /// Validate the email, set the identity, and synchronize the three
    /// identity-scoped collections. Their individual failures surface as
    /// notices and per-store Failed states; sign-in itself only fails on a
    /// malformed email. Signing in over an existing identity tears the old
    /// state down first.
    pub async fn sign_in(&self, email: &str) -> Result<()> {
        let identity =
            Identity::parse(email).map_err(|e| SyncError::Validation(e.to_string()))?;

        if self.session.identity().is_some() {
            self.teardown();
        }
        self.session.set(identity.clone());
        info!(email = %identity, "Signed in");
        self.notices.publish(Notice::SignedIn {
            email: identity.to_string(),
        });

        let _ = futures::join!(
            self.bookmarks.load(&identity),
            self.archive.load(&identity),
            self.preferences.load(&identity),
        );
        Ok(())
    }

    /// Clear the identity and discard everything scoped to it. The feed is
    /// not identity-scoped and survives. A no-op when nobody is signed in.
    pub fn sign_out(&self) {
        if !self.session.clear() {
            return;
        }
        self.teardown();
        info!("Signed out");
        self.notices.publish(Notice::SignedOut);
    }

    fn teardown(&self) {
        self.bookmarks.reset();
        self.archive.reset();
        self.preferences.reset();
    }

    // --- Intents ---

    pub async fn refresh_feed(&self) -> Result<()> {
        self.feed.refresh().await
    }

    pub async fn set_feed_category(&self, category: Option<Category>) -> Result<()> {
        self.feed.set_category(category).await
    }

    pub async fn toggle_bookmark(&self, id: &ArticleId) -> Result<bool> {
        let identity = self.require_identity()?;
        self.bookmarks.toggle(&identity, id).await
    }

    pub async fn set_alert_bookmark(&self, id: &ArticleId, desired: bool) -> Result<bool> {
        let identity = self.require_identity()?;
        self.archive.set_bookmark(&identity, id, desired).await
    }

    pub async fn save_preferences(&self, draft: Preferences) -> Result<()> {
        let identity = self.require_identity()?;
        self.preferences.save(&identity, draft).await
    }

    // --- Projections ---

    /// The filtered feed with each article's derived bookmark flag.
    pub fn feed_view(&self, filter: &FilterState) -> Vec<FeedEntry> {
        self.feed
            .visible(filter)
            .into_iter()
            .map(|article| FeedEntry {
                bookmarked: self.bookmarks.is_bookmarked(&article.id),
                article,
            })
            .collect()
    }

    pub fn alerts_view(&self, filter: &FilterState) -> Vec<AlertRecord> {
        self.archive.visible(filter)
    }

    // --- Component access ---

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn feed(&self) -> &ArticleStore {
        &self.feed
    }

    pub fn bookmarks(&self) -> &BookmarkTracker {
        &self.bookmarks
    }

    pub fn archive(&self) -> &AlertArchive {
        &self.archive
    }

    pub fn preferences(&self) -> &PreferenceController {
        &self.preferences
    }

    fn require_identity(&self) -> Result<Identity> {
        self.session.identity().ok_or(SyncError::InvalidIdentity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LoadState;
    use crate::preferences::PrefState;
    use crate::testing::{alert, article, MockGateway, Op};
    use newspulse_common::Category;

    #[tokio::test]
    async fn sign_in_rejects_malformed_email() {
        let gateway = Arc::new(MockGateway::new());
        let (hub, _rx) = SyncHub::new(gateway.clone());

        let err = hub.sign_in("not-an-email").await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(!hub.session().is_signed_in());
        assert_eq!(gateway.call_count(Op::FetchBookmarks), 0);
        assert_eq!(gateway.call_count(Op::FetchAlerts), 0);
        assert_eq!(gateway.call_count(Op::FetchPreferences), 0);
    }

    #[tokio::test]
    async fn sign_in_syncs_identity_scoped_collections() {
        let gateway = Arc::new(
            MockGateway::new()
                .on_bookmarks("reader@example.com", ["a1"])
                .on_alerts(
                    "reader@example.com",
                    vec![alert("n1", "Alert", Category::General, false)],
                ),
        );
        let (hub, mut rx) = SyncHub::new(gateway.clone());

        hub.sign_in("reader@example.com").await.unwrap();

        assert!(hub.session().is_signed_in());
        assert_eq!(hub.bookmarks().len(), 1);
        assert_eq!(hub.archive().items().len(), 1);
        assert!(matches!(hub.preferences().state(), PrefState::Loaded(_)));
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::SignedIn {
                email: "reader@example.com".to_string()
            }
        );
    }

    #[tokio::test]
    async fn sign_out_discards_identity_scoped_state_but_keeps_feed() {
        let gateway = Arc::new(
            MockGateway::new()
                .on_feed(None, vec![article("a1", "Story", Category::General)])
                .on_bookmarks("reader@example.com", ["a1"]),
        );
        let (hub, _rx) = SyncHub::new(gateway);

        hub.refresh_feed().await.unwrap();
        hub.sign_in("reader@example.com").await.unwrap();
        hub.sign_out();

        assert!(!hub.session().is_signed_in());
        assert_eq!(hub.feed().items().len(), 1);
        assert!(hub.bookmarks().is_empty());
        assert_eq!(hub.archive().load_state(), LoadState::Idle);
        assert_eq!(hub.preferences().state(), PrefState::Unloaded);
    }

    #[tokio::test]
    async fn sign_out_when_signed_out_is_silent() {
        let gateway = Arc::new(MockGateway::new());
        let (hub, mut rx) = SyncHub::new(gateway);

        hub.sign_out();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn switching_identities_never_leaks_previous_state() {
        let gateway = Arc::new(
            MockGateway::new()
                .on_bookmarks("first@example.com", ["a1", "a2"])
                .on_bookmarks("second@example.com", ["b1"]),
        );
        let (hub, _rx) = SyncHub::new(gateway);

        hub.sign_in("first@example.com").await.unwrap();
        assert_eq!(hub.bookmarks().len(), 2);

        hub.sign_in("second@example.com").await.unwrap();
        assert_eq!(hub.bookmarks().len(), 1);
        assert!(hub.bookmarks().is_bookmarked(&"b1".into()));
        assert!(!hub.bookmarks().is_bookmarked(&"a1".into()));
    }

    #[tokio::test]
    async fn mutations_require_a_signed_in_identity() {
        let gateway = Arc::new(MockGateway::new());
        let (hub, _rx) = SyncHub::new(gateway.clone());

        let err = hub.toggle_bookmark(&"a1".into()).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidIdentity));
        let err = hub.set_alert_bookmark(&"n1".into(), true).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidIdentity));
        let err = hub
            .save_preferences(Preferences {
                categories: vec![Category::General],
                ..Preferences::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidIdentity));
        assert_eq!(gateway.call_count(Op::ToggleFeedBookmark), 0);
        assert_eq!(gateway.call_count(Op::ToggleAlertBookmark), 0);
        assert_eq!(gateway.call_count(Op::SavePreferences), 0);
    }

    #[tokio::test]
    async fn feed_view_derives_bookmark_flags_from_membership() {
        let gateway = Arc::new(
            MockGateway::new()
                .on_feed(None, vec![
                    article("a1", "Bookmarked story", Category::General),
                    article("a2", "Plain story", Category::General),
                ])
                .on_bookmarks("reader@example.com", ["a1"]),
        );
        let (hub, _rx) = SyncHub::new(gateway);

        hub.refresh_feed().await.unwrap();
        hub.sign_in("reader@example.com").await.unwrap();

        let view = hub.feed_view(&FilterState::default());
        let flags: Vec<_> = view.iter().map(|e| (e.article.id.as_str(), e.bookmarked)).collect();
        assert_eq!(flags, vec![("a1", true), ("a2", false)]);

        // The flag tracks membership with no feed re-fetch.
        hub.toggle_bookmark(&"a2".into()).await.unwrap();
        let view = hub.feed_view(&FilterState::default());
        assert!(view.iter().all(|e| e.bookmarked));
    }
}
