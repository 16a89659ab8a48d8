use std::env;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables. Everything has a
/// default, so a bare environment points at a local backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the news backend, without a trailing slash.
    pub api_base_url: String,
    /// Timeout applied to every HTTP request.
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("NEWSPULSE_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            http_timeout_secs: env::var("NEWSPULSE_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .expect("NEWSPULSE_HTTP_TIMEOUT_SECS must be a number"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}
