use newspulse_common::ArticleId;
use newspulse_gateway::GatewayError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Failure taxonomy surfaced to the presentation layer. Every variant is
/// recoverable: a retry or the next identity change clears it.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No signed-in identity")]
    InvalidIdentity,

    #[error("Bookmark for {id} could not be confirmed: {cause}")]
    BookmarkSync { id: ArticleId, cause: String },
}

impl From<GatewayError> for SyncError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Network(msg) => SyncError::Network(msg),
            GatewayError::Server { status, message } => SyncError::Server { status, message },
            GatewayError::Parse(msg) => SyncError::Parse(msg),
            GatewayError::Validation(msg) => SyncError::Validation(msg),
            GatewayError::InvalidIdentity => SyncError::InvalidIdentity,
        }
    }
}
