// Trait abstraction for the remote gateway.
//
// NewsGateway fronts NewsApiClient so the stores never see reqwest directly.
// MockGateway in testing.rs implements the same trait, which keeps every
// store testable without a network.

use std::collections::HashSet;

use async_trait::async_trait;

use newspulse_common::{AlertRecord, Article, ArticleId, Category, Preferences};
use newspulse_gateway::{GatewayError, NewsApiClient};

#[async_trait]
pub trait NewsGateway: Send + Sync {
    /// Fetch the live feed, optionally narrowed to one category.
    async fn fetch_feed(&self, category: Option<Category>) -> Result<Vec<Article>, GatewayError>;

    /// Fetch the delivered-alert history for a subscriber.
    async fn fetch_alerts(&self, email: &str) -> Result<Vec<AlertRecord>, GatewayError>;

    /// Fetch the subscriber's bookmarked article ids.
    async fn fetch_bookmarks(&self, email: &str) -> Result<HashSet<ArticleId>, GatewayError>;

    /// Flip a feed bookmark. `bookmarked` is the caller-tracked prior state;
    /// the returned boolean is the new membership.
    async fn toggle_feed_bookmark(
        &self,
        email: &str,
        article_id: &ArticleId,
        bookmarked: bool,
    ) -> Result<bool, GatewayError>;

    /// Flip an alert-history bookmark flag. The returned boolean is the
    /// server's authoritative new value.
    async fn toggle_alert_bookmark(
        &self,
        email: &str,
        alert_id: &ArticleId,
    ) -> Result<bool, GatewayError>;

    /// Fetch stored preferences, `None` for a first-time subscriber.
    async fn fetch_preferences(&self, email: &str) -> Result<Option<Preferences>, GatewayError>;

    /// Create or overwrite the subscriber's preferences.
    async fn save_preferences(
        &self,
        email: &str,
        prefs: &Preferences,
    ) -> Result<(), GatewayError>;
}

#[async_trait]
impl NewsGateway for NewsApiClient {
    async fn fetch_feed(&self, category: Option<Category>) -> Result<Vec<Article>, GatewayError> {
        self.fetch_feed(category).await
    }

    async fn fetch_alerts(&self, email: &str) -> Result<Vec<AlertRecord>, GatewayError> {
        self.fetch_alerts(email).await
    }

    async fn fetch_bookmarks(&self, email: &str) -> Result<HashSet<ArticleId>, GatewayError> {
        self.fetch_bookmarks(email).await
    }

    async fn toggle_feed_bookmark(
        &self,
        email: &str,
        article_id: &ArticleId,
        bookmarked: bool,
    ) -> Result<bool, GatewayError> {
        self.toggle_feed_bookmark(email, article_id, bookmarked).await
    }

    async fn toggle_alert_bookmark(
        &self,
        email: &str,
        alert_id: &ArticleId,
    ) -> Result<bool, GatewayError> {
        self.toggle_alert_bookmark(email, alert_id).await
    }

    async fn fetch_preferences(&self, email: &str) -> Result<Option<Preferences>, GatewayError> {
        self.fetch_preferences(email).await
    }

    async fn save_preferences(
        &self,
        email: &str,
        prefs: &Preferences,
    ) -> Result<(), GatewayError> {
        self.save_preferences(email, prefs).await
    }
}
