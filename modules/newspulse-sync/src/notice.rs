use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use newspulse_common::ArticleId;

/// Transient notifications for the presentation layer. Each one corresponds
/// to a toast or banner; none of them carry state the stores do not already
/// hold, so a shell may drop or debounce them freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    SignedIn { email: String },
    SignedOut,
    FeedLoadFailed { error: String },
    AlertsLoadFailed { error: String },
    BookmarkFailed { article_id: ArticleId, error: String },
    PreferencesLoadFailed { error: String },
    PreferencesSaved,
    PreferencesSaveFailed { error: String },
}

/// Cloneable sending half of the notice stream. A shell that stops reading
/// (or never reads) costs nothing: sends to a closed channel are discarded.
#[derive(Clone)]
pub struct NoticeSender {
    tx: mpsc::UnboundedSender<Notice>,
}

impl NoticeSender {
    pub fn channel() -> (NoticeSender, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (NoticeSender { tx }, rx)
    }

    pub fn publish(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_after_receiver_dropped_is_silent() {
        let (tx, rx) = NoticeSender::channel();
        drop(rx);
        tx.publish(Notice::SignedOut);
    }

    #[test]
    fn notices_serialize_with_type_tag() {
        let notice = Notice::BookmarkFailed {
            article_id: ArticleId::from("a1"),
            error: "Network error: boom".to_string(),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["type"], "bookmark_failed");
        assert_eq!(json["article_id"], "a1");
    }
}
