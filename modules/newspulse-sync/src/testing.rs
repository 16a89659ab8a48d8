// Test mocks for the sync layer.
//
// MockGateway implements NewsGateway over HashMap-registered responses:
// builder methods (`.on_feed()`, `.on_alerts()`, `.on_bookmarks()`,
// `.on_preferences()`) seed the fixtures, `set_fail` injects server
// failures per operation, and `hold`/`release` park calls on a gate so
// tests can interleave in-flight operations deterministically. Every call
// is recorded before it parks, so `wait_for_calls` can rendezvous with a
// held operation.
//
// Plus helpers for constructing Article and AlertRecord fixtures.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use newspulse_common::{AlertRecord, Article, ArticleId, Category, Preferences};
use newspulse_gateway::GatewayError;

use crate::traits::NewsGateway;

/// One logical gateway operation, used to key failure injection, call
/// recording, and hold gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FetchFeed,
    FetchAlerts,
    FetchBookmarks,
    ToggleFeedBookmark,
    ToggleAlertBookmark,
    FetchPreferences,
    SavePreferences,
}

/// A feed article fixture with sensible defaults for everything a test
/// does not care about.
pub fn article(id: &str, title: &str, category: Category) -> Article {
    Article {
        id: ArticleId::from(id),
        title: title.to_string(),
        description: None,
        source: "Mock Wire".to_string(),
        category,
        image_url: None,
        published_at: Utc::now(),
        url: format!("https://news.example.com/{id}"),
    }
}

/// An alert-history fixture.
pub fn alert(id: &str, title: &str, category: Category, bookmarked: bool) -> AlertRecord {
    AlertRecord {
        id: ArticleId::from(id),
        title: title.to_string(),
        description: None,
        source: "Mock Wire".to_string(),
        category,
        image_url: None,
        published_at: Utc::now(),
        url: format!("https://news.example.com/{id}"),
        bookmarked,
    }
}

fn server_failure(op: Op) -> GatewayError {
    GatewayError::Server {
        status: 500,
        message: format!("mock failure for {op:?}"),
    }
}

#[derive(Default)]
struct Fixtures {
    // Feed responses keyed by category wire string, "" for all categories.
    feeds: HashMap<String, Vec<Article>>,
    alerts: HashMap<String, Vec<AlertRecord>>,
    bookmarks: HashMap<String, HashSet<ArticleId>>,
    preferences: HashMap<String, Preferences>,
    // Server-side alert bookmark flags, flipped by toggle_alert_bookmark.
    alert_flags: HashMap<ArticleId, bool>,
    forced_alert_results: HashMap<ArticleId, bool>,
}

pub struct MockGateway {
    fixtures: Mutex<Fixtures>,
    failures: Mutex<HashSet<Op>>,
    calls: Mutex<HashMap<Op, Vec<String>>>,
    gates: Mutex<HashMap<Op, Arc<Semaphore>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            fixtures: Mutex::new(Fixtures::default()),
            failures: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    // --- Builders ---

    pub fn on_feed(self, category: Option<Category>, items: Vec<Article>) -> Self {
        self.set_feed(category, items);
        self
    }

    pub fn on_alerts(self, email: &str, items: Vec<AlertRecord>) -> Self {
        self.set_alerts(email, items);
        self
    }

    pub fn on_bookmarks<I>(self, email: &str, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ArticleId>,
    {
        let ids = ids.into_iter().map(Into::into).collect();
        self.fixtures
            .lock()
            .unwrap()
            .bookmarks
            .insert(email.to_string(), ids);
        self
    }

    pub fn on_preferences(self, email: &str, prefs: Preferences) -> Self {
        self.fixtures
            .lock()
            .unwrap()
            .preferences
            .insert(email.to_string(), prefs);
        self
    }

    // --- Knobs ---

    /// Replace a feed fixture after construction.
    pub fn set_feed(&self, category: Option<Category>, items: Vec<Article>) {
        let key = category.map(|c| c.to_string()).unwrap_or_default();
        self.fixtures.lock().unwrap().feeds.insert(key, items);
    }

    /// Replace an alert-history fixture after construction, reseeding the
    /// server-side bookmark flags from the records.
    pub fn set_alerts(&self, email: &str, items: Vec<AlertRecord>) {
        let mut fixtures = self.fixtures.lock().unwrap();
        for item in &items {
            fixtures.alert_flags.insert(item.id.clone(), item.bookmarked);
        }
        fixtures.alerts.insert(email.to_string(), items);
    }

    /// Make every subsequent call of `op` fail with a server error.
    pub fn set_fail(&self, op: Op, fail: bool) {
        let mut failures = self.failures.lock().unwrap();
        if fail {
            failures.insert(op);
        } else {
            failures.remove(&op);
        }
    }

    /// Park subsequent calls of `op` behind a gate until `release`.
    pub fn hold(&self, op: Op) {
        self.gates
            .lock()
            .unwrap()
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Let exactly one parked call of `op` proceed, in arrival order.
    pub fn release(&self, op: Op) {
        if let Some(gate) = self.gates.lock().unwrap().get(&op) {
            gate.add_permits(1);
        }
    }

    /// Pin the server's answer for one alert's bookmark toggle, regardless
    /// of the flag's recorded state.
    pub fn force_alert_toggle_result(&self, id: &ArticleId, result: bool) {
        self.fixtures
            .lock()
            .unwrap()
            .forced_alert_results
            .insert(id.clone(), result);
    }

    // --- Observations ---

    pub fn call_count(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).map_or(0, Vec::len)
    }

    pub fn calls_of(&self, op: Op) -> Vec<String> {
        self.calls.lock().unwrap().get(&op).cloned().unwrap_or_default()
    }

    /// Wait until at least `n` calls of `op` have been recorded. Held calls
    /// count: recording happens before the gate.
    pub async fn wait_for_calls(&self, op: Op, n: usize) {
        while self.call_count(op) < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    pub fn stored_preferences(&self, email: &str) -> Option<Preferences> {
        self.fixtures.lock().unwrap().preferences.get(email).cloned()
    }

    // --- Internals ---

    fn record(&self, op: Op, detail: String) {
        self.calls.lock().unwrap().entry(op).or_default().push(detail);
    }

    async fn gate(&self, op: Op) {
        let gate = self.gates.lock().unwrap().get(&op).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("mock gate closed").forget();
        }
    }

    fn check_fail(&self, op: Op) -> Result<(), GatewayError> {
        if self.failures.lock().unwrap().contains(&op) {
            return Err(server_failure(op));
        }
        Ok(())
    }

    async fn enter(&self, op: Op, detail: String) -> Result<(), GatewayError> {
        self.record(op, detail);
        self.gate(op).await;
        self.check_fail(op)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NewsGateway for MockGateway {
    async fn fetch_feed(&self, category: Option<Category>) -> Result<Vec<Article>, GatewayError> {
        let key = category.map(|c| c.to_string()).unwrap_or_default();
        self.enter(Op::FetchFeed, key.clone()).await?;
        Ok(self
            .fixtures
            .lock()
            .unwrap()
            .feeds
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_alerts(&self, email: &str) -> Result<Vec<AlertRecord>, GatewayError> {
        self.enter(Op::FetchAlerts, email.to_string()).await?;
        Ok(self
            .fixtures
            .lock()
            .unwrap()
            .alerts
            .get(email)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_bookmarks(&self, email: &str) -> Result<HashSet<ArticleId>, GatewayError> {
        self.enter(Op::FetchBookmarks, email.to_string()).await?;
        Ok(self
            .fixtures
            .lock()
            .unwrap()
            .bookmarks
            .get(email)
            .cloned()
            .unwrap_or_default())
    }

    async fn toggle_feed_bookmark(
        &self,
        email: &str,
        article_id: &ArticleId,
        bookmarked: bool,
    ) -> Result<bool, GatewayError> {
        let action = if bookmarked { "remove" } else { "add" };
        self.enter(Op::ToggleFeedBookmark, format!("{article_id}:{action}"))
            .await?;
        let mut fixtures = self.fixtures.lock().unwrap();
        let set = fixtures.bookmarks.entry(email.to_string()).or_default();
        if bookmarked {
            set.remove(article_id);
        } else {
            set.insert(article_id.clone());
        }
        Ok(!bookmarked)
    }

    async fn toggle_alert_bookmark(
        &self,
        email: &str,
        alert_id: &ArticleId,
    ) -> Result<bool, GatewayError> {
        let _ = email;
        self.enter(Op::ToggleAlertBookmark, alert_id.to_string())
            .await?;
        let mut fixtures = self.fixtures.lock().unwrap();
        if let Some(&forced) = fixtures.forced_alert_results.get(alert_id) {
            fixtures.alert_flags.insert(alert_id.clone(), forced);
            return Ok(forced);
        }
        let flag = fixtures.alert_flags.entry(alert_id.clone()).or_insert(false);
        *flag = !*flag;
        Ok(*flag)
    }

    async fn fetch_preferences(&self, email: &str) -> Result<Option<Preferences>, GatewayError> {
        self.enter(Op::FetchPreferences, email.to_string()).await?;
        Ok(self.fixtures.lock().unwrap().preferences.get(email).cloned())
    }

    async fn save_preferences(
        &self,
        email: &str,
        prefs: &Preferences,
    ) -> Result<(), GatewayError> {
        self.enter(Op::SavePreferences, email.to_string()).await?;
        if prefs.categories.is_empty() {
            return Err(GatewayError::Validation(
                "at least one category is required".to_string(),
            ));
        }
        self.fixtures
            .lock()
            .unwrap()
            .preferences
            .insert(email.to_string(), prefs.clone());
        Ok(())
    }
}
