pub mod error;

pub use error::{GatewayError, Result};

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use newspulse_common::{AlertRecord, Article, ArticleId, Category, Config, Preferences};

/// Typed facade over the news backend. Stateless apart from the connection
/// pool; every method is a single request/response exchange.
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookmarkEntry {
    article_id: ArticleId,
}

#[derive(Debug, Deserialize)]
struct AlertBookmarkState {
    bookmarked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedBookmarkBody<'a> {
    email: &'a str,
    article_id: &'a ArticleId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertBookmarkBody<'a> {
    email: &'a str,
    alert_id: &'a ArticleId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeBody<'a> {
    email: &'a str,
    categories: &'a [Category],
    frequency: newspulse_common::Frequency,
    notification_method: newspulse_common::DeliveryMethod,
}

impl NewsApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// Fetch the live feed, optionally narrowed to one category. The backend
    /// treats an empty `category` param as "all categories".
    pub async fn fetch_feed(&self, category: Option<Category>) -> Result<Vec<Article>> {
        let url = format!("{}/news", self.base_url);
        let category = category.map(|c| c.to_string()).unwrap_or_default();
        debug!(category = %category, "Fetching news feed");

        let resp = self
            .client
            .get(&url)
            .query(&[("category", category.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch the delivered-alert history for one subscriber. Same path as the
    /// feed; the `email` param selects the history view.
    pub async fn fetch_alerts(&self, email: &str) -> Result<Vec<AlertRecord>> {
        require_identity(email)?;
        let url = format!("{}/news", self.base_url);
        debug!(email, "Fetching alert history");

        let resp = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch the subscriber's bookmarked article ids.
    pub async fn fetch_bookmarks(&self, email: &str) -> Result<HashSet<ArticleId>> {
        require_identity(email)?;
        let url = format!("{}/users/bookmarks", self.base_url);
        debug!(email, "Fetching bookmarks");

        let resp = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let entries: Vec<BookmarkEntry> = resp.json().await?;
        Ok(entries.into_iter().map(|e| e.article_id).collect())
    }

    /// Flip a feed bookmark. The endpoint is chosen from the caller-tracked
    /// prior state; the returned boolean is the new membership.
    pub async fn toggle_feed_bookmark(
        &self,
        email: &str,
        article_id: &ArticleId,
        bookmarked: bool,
    ) -> Result<bool> {
        require_identity(email)?;
        let endpoint = if bookmarked {
            "remove-bookmark"
        } else {
            "add-bookmark"
        };
        let url = format!("{}/users/{}", self.base_url, endpoint);
        debug!(email, article_id = %article_id, endpoint, "Toggling feed bookmark");

        let body = FeedBookmarkBody { email, article_id };
        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(!bookmarked)
    }

    /// Flip the bookmark flag on an alert-history record. The server answers
    /// with the flag's new value, which callers must treat as authoritative.
    pub async fn toggle_alert_bookmark(&self, email: &str, alert_id: &ArticleId) -> Result<bool> {
        require_identity(email)?;
        let url = format!("{}/news/bookmark", self.base_url);
        debug!(email, alert_id = %alert_id, "Toggling alert bookmark");

        let body = AlertBookmarkBody { email, alert_id };
        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let state: AlertBookmarkState = resp.json().await?;
        Ok(state.bookmarked)
    }

    /// Fetch stored preferences. A subscriber who has never saved any gets
    /// an empty response body, surfaced here as `None`.
    pub async fn fetch_preferences(&self, email: &str) -> Result<Option<Preferences>> {
        require_identity(email)?;
        let url = format!("{}/users/preferences", self.base_url);
        debug!(email, "Fetching preferences");

        let resp = self
            .client
            .get(&url)
            .query(&[("email", email)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }
        let prefs: Preferences = serde_json::from_str(trimmed)?;
        Ok(Some(prefs))
    }

    /// Create or overwrite the subscriber's preferences. The category check
    /// duplicates the client-side one so a bad caller cannot wipe a
    /// subscription by submitting an empty selection.
    pub async fn save_preferences(&self, email: &str, prefs: &Preferences) -> Result<()> {
        require_identity(email)?;
        if prefs.categories.is_empty() {
            return Err(GatewayError::Validation(
                "at least one category is required".to_string(),
            ));
        }
        let url = format!("{}/users/subscribe", self.base_url);
        debug!(email, categories = prefs.categories.len(), "Saving preferences");

        let body = SubscribeBody {
            email,
            categories: &prefs.categories,
            frequency: prefs.frequency,
            notification_method: prefs.delivery,
        };
        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

fn require_identity(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(GatewayError::InvalidIdentity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identity_scoped_calls_reject_empty_email() {
        let client = NewsApiClient::new("http://localhost:1", Duration::from_secs(1));
        let err = client.fetch_alerts("").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidIdentity));
        let err = client.fetch_bookmarks("   ").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidIdentity));
    }

    #[tokio::test]
    async fn save_rejects_empty_categories_before_any_request() {
        // Port 1 is unroutable, so reaching the network would fail loudly
        // with a different error variant than the one asserted here.
        let client = NewsApiClient::new("http://localhost:1", Duration::from_secs(1));
        let prefs = Preferences::default();
        let err = client.save_preferences("reader@example.com", &prefs).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = NewsApiClient::new("http://localhost:5000/api/", Duration::from_secs(1));
        assert_eq!(client.base_url, "http://localhost:5000/api");
    }
}
