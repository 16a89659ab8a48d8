use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Categories ---

/// News categories recognized by the backend. The wire format is the
/// lowercase name, both in query params and article payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Business,
    Entertainment,
    Health,
    Science,
    Sports,
    Technology,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::General,
        Category::Business,
        Category::Entertainment,
        Category::Health,
        Category::Science,
        Category::Sports,
        Category::Technology,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::General => write!(f, "general"),
            Category::Business => write!(f, "business"),
            Category::Entertainment => write!(f, "entertainment"),
            Category::Health => write!(f, "health"),
            Category::Science => write!(f, "science"),
            Category::Sports => write!(f, "sports"),
            Category::Technology => write!(f, "technology"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "business" => Ok(Self::Business),
            "entertainment" => Ok(Self::Entertainment),
            "health" => Ok(Self::Health),
            "science" => Ok(Self::Science),
            "sports" => Ok(Self::Sports),
            "technology" => Ok(Self::Technology),
            _ => Err(anyhow::anyhow!("Unknown category: {}", s)),
        }
    }
}

// --- Alert Preferences ---

/// How often the backend batches alert deliveries for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Immediate,
    Hourly,
    Daily,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Immediate => write!(f, "immediate"),
            Frequency::Hourly => write!(f, "hourly"),
            Frequency::Daily => write!(f, "daily"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(Self::Immediate),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            _ => Err(anyhow::anyhow!("Unknown frequency: {}", s)),
        }
    }
}

/// Channel an alert is delivered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Email,
    Push,
    Both,
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::Email => write!(f, "email"),
            DeliveryMethod::Push => write!(f, "push"),
            DeliveryMethod::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for DeliveryMethod {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "push" => Ok(Self::Push),
            "both" => Ok(Self::Both),
            _ => Err(anyhow::anyhow!("Unknown delivery method: {}", s)),
        }
    }
}

/// A subscriber's alert preferences. Absent fields in server payloads fall
/// back to defaults, matching a subscriber who has never saved anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, rename = "notificationMethod")]
    pub delivery: DeliveryMethod,
}

// --- Articles and Alerts ---

/// Opaque server-assigned article identifier. Also keys alert records,
/// since every alert points at the article that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl ArticleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        ArticleId(s.to_string())
    }
}

impl From<String> for ArticleId {
    fn from(s: String) -> Self {
        ArticleId(s)
    }
}

/// One article as served by the feed endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: ArticleId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

/// One delivered alert from the subscriber's history. Carries the article
/// snapshot it was generated from plus a per-subscriber bookmark flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[serde(rename = "_id")]
    pub id: ArticleId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub url: String,
    #[serde(default)]
    pub bookmarked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_parses_wire_field_names() {
        let raw = r#"{
            "_id": "a1",
            "title": "Fusion milestone",
            "description": "Net energy gain",
            "source": "Reuters",
            "category": "science",
            "imageUrl": "https://cdn.example.com/a1.jpg",
            "publishedAt": "2024-03-01T12:00:00Z",
            "url": "https://example.com/a1"
        }"#;
        let article: Article = serde_json::from_str(raw).unwrap();
        assert_eq!(article.id, ArticleId::from("a1"));
        assert_eq!(article.category, Category::Science);
        assert_eq!(article.image_url.as_deref(), Some("https://cdn.example.com/a1.jpg"));
    }

    #[test]
    fn article_tolerates_missing_optional_fields() {
        let raw = r#"{
            "_id": "a2",
            "title": "Quiet day",
            "source": "AP",
            "category": "general",
            "publishedAt": "2024-03-02T08:30:00Z",
            "url": "https://example.com/a2"
        }"#;
        let article: Article = serde_json::from_str(raw).unwrap();
        assert!(article.description.is_none());
        assert!(article.image_url.is_none());
    }

    #[test]
    fn alert_bookmark_flag_defaults_to_false() {
        let raw = r#"{
            "_id": "n1",
            "title": "Rate decision",
            "source": "Bloomberg",
            "category": "business",
            "publishedAt": "2024-03-03T14:00:00Z",
            "url": "https://example.com/n1"
        }"#;
        let alert: AlertRecord = serde_json::from_str(raw).unwrap();
        assert!(!alert.bookmarked);
    }

    #[test]
    fn preferences_fill_defaults_from_sparse_payload() {
        let prefs: Preferences = serde_json::from_str("{}").unwrap();
        assert!(prefs.categories.is_empty());
        assert_eq!(prefs.frequency, Frequency::Immediate);
        assert_eq!(prefs.delivery, DeliveryMethod::Email);
    }

    #[test]
    fn preferences_use_wire_name_for_delivery() {
        let prefs = Preferences {
            categories: vec![Category::Technology],
            frequency: Frequency::Daily,
            delivery: DeliveryMethod::Push,
        };
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["notificationMethod"], "push");
        assert_eq!(json["frequency"], "daily");
        assert_eq!(json["categories"][0], "technology");
    }

    #[test]
    fn category_round_trips_through_from_str() {
        for category in Category::ALL {
            let parsed: Category = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("weather".parse::<Category>().is_err());
    }
}
