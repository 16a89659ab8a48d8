use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use newspulse_common::{Article, Category};

use crate::error::Result;
use crate::filter::{self, FilterState};
use crate::lifecycle::{lock, Epoch, LoadState};
use crate::notice::{Notice, NoticeSender};
use crate::traits::NewsGateway;
use crate::SyncError;

/// Live news feed for one category. The collection is replaced wholesale on
/// every successful fetch; a failed fetch keeps whatever was already loaded.
pub struct ArticleStore {
    gateway: Arc<dyn NewsGateway>,
    notices: NoticeSender,
    state: Mutex<FeedState>,
    epoch: Epoch,
}

#[derive(Default)]
struct FeedState {
    category: Option<Category>,
    items: Vec<Article>,
    load_state: LoadState,
}

impl ArticleStore {
    pub fn new(gateway: Arc<dyn NewsGateway>, notices: NoticeSender) -> Self {
        Self {
            gateway,
            notices,
            state: Mutex::new(FeedState::default()),
            epoch: Epoch::new(),
        }
    }

    /// Switch the fetch category and reload. `None` asks the backend for
    /// every category.
    pub async fn set_category(&self, category: Option<Category>) -> Result<()> {
        lock(&self.state).category = category;
        self.refresh().await
    }

    /// Reload the feed for the current category. A refresh started while an
    /// older one is in flight supersedes it: the older response is discarded
    /// no matter which order the two resolve in.
    pub async fn refresh(&self) -> Result<()> {
        let ticket = self.epoch.advance();
        let category = {
            let mut state = lock(&self.state);
            state.load_state = LoadState::Loading;
            state.category
        };

        let result = self.gateway.fetch_feed(category).await;

        let mut state = lock(&self.state);
        if !self.epoch.is_current(ticket) {
            debug!(ticket, "Discarding superseded feed response");
            return Ok(());
        }
        match result {
            Ok(items) => {
                debug!(count = items.len(), "Feed loaded");
                state.items = items;
                state.load_state = LoadState::Loaded;
                Ok(())
            }
            Err(err) => {
                // Stale-but-present beats empty: items stay as they were.
                state.load_state = LoadState::Failed;
                let err = SyncError::from(err);
                warn!(error = %err, "Feed load failed");
                self.notices.publish(Notice::FeedLoadFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn category(&self) -> Option<Category> {
        lock(&self.state).category
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load_state
    }

    /// Snapshot of the loaded items, unfiltered.
    pub fn items(&self) -> Vec<Article> {
        lock(&self.state).items.clone()
    }

    /// Projection of the loaded items through a view filter. Never mutates
    /// the underlying collection.
    pub fn visible(&self, filter: &FilterState) -> Vec<Article> {
        let state = lock(&self.state);
        state
            .items
            .iter()
            .filter(|a| filter::matches(filter, a.category, &a.title, a.description.as_deref()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, MockGateway, Op};

    fn store(gateway: Arc<MockGateway>) -> ArticleStore {
        let (notices, _rx) = NoticeSender::channel();
        ArticleStore::new(gateway, notices)
    }

    #[tokio::test]
    async fn refresh_replaces_items_wholesale() {
        let gateway = Arc::new(
            MockGateway::new().on_feed(None, vec![article("a1", "Old story", Category::General)]),
        );
        let store = store(gateway.clone());

        store.refresh().await.unwrap();
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.load_state(), LoadState::Loaded);

        gateway.set_feed(None, vec![
            article("a2", "New story", Category::General),
            article("a3", "Another story", Category::General),
        ]);
        store.refresh().await.unwrap();

        let ids: Vec<_> = store.items().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a2".into(), "a3".into()]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_items() {
        let gateway = Arc::new(
            MockGateway::new().on_feed(None, vec![article("a1", "Kept story", Category::General)]),
        );
        let store = store(gateway.clone());
        store.refresh().await.unwrap();

        gateway.set_fail(Op::FetchFeed, true);
        let err = store.refresh().await.unwrap_err();
        assert!(matches!(err, SyncError::Server { .. }));
        assert_eq!(store.load_state(), LoadState::Failed);
        assert_eq!(store.items().len(), 1);
    }

    #[tokio::test]
    async fn set_category_fetches_that_category() {
        let gateway = Arc::new(MockGateway::new().on_feed(
            Some(Category::Technology),
            vec![article("t1", "Chips", Category::Technology)],
        ));
        let store = store(gateway.clone());

        store.set_category(Some(Category::Technology)).await.unwrap();
        assert_eq!(store.category(), Some(Category::Technology));
        assert_eq!(store.items().len(), 1);
        assert_eq!(gateway.calls_of(Op::FetchFeed), vec!["technology"]);
    }

    #[tokio::test]
    async fn query_projection_matches_title_or_description() {
        let gateway = Arc::new(MockGateway::new().on_feed(
            Some(Category::Technology),
            vec![
                article("t1", "The AI race heats up", Category::Technology),
                article("t2", "Chip fabs expand", Category::Technology),
                article("t3", "Cloud earnings", Category::Technology),
            ],
        ));
        let store = store(gateway);
        store.set_category(Some(Category::Technology)).await.unwrap();

        let visible = store.visible(&FilterState::with_query("ai"));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "t1".into());
    }

    #[tokio::test]
    async fn category_projection_passes_only_that_category() {
        let gateway = Arc::new(MockGateway::new().on_feed(None, vec![
            article("a1", "Match report", Category::Sports),
            article("a2", "Earnings", Category::Business),
        ]));
        let store = store(gateway);
        store.refresh().await.unwrap();

        let visible = store.visible(&FilterState::with_category(Category::Sports));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].category, Category::Sports);

        let all = store.visible(&FilterState::default());
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn superseded_refresh_never_overwrites_newer_state() {
        let gateway = Arc::new(
            MockGateway::new()
                .on_feed(None, vec![article("old", "Old story", Category::General)])
                .on_feed(
                    Some(Category::Science),
                    vec![article("new", "New story", Category::Science)],
                ),
        );
        gateway.hold(Op::FetchFeed);
        let store = Arc::new(store(gateway.clone()));

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.refresh().await }
        });
        gateway.wait_for_calls(Op::FetchFeed, 1).await;

        let fast = tokio::spawn({
            let store = store.clone();
            async move { store.set_category(Some(Category::Science)).await }
        });
        gateway.wait_for_calls(Op::FetchFeed, 2).await;

        // Resolve the stale fetch first, then the newer one.
        gateway.release(Op::FetchFeed);
        gateway.release(Op::FetchFeed);
        slow.await.unwrap().unwrap();
        fast.await.unwrap().unwrap();

        let ids: Vec<_> = store.items().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["new".into()]);
        assert_eq!(store.load_state(), LoadState::Loaded);
    }
}
