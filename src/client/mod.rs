//! Typed client for the LinkUp API and the in-memory feed built on it.

mod api;
mod feed;
mod session;

pub use api::ApiClient;
pub use feed::{Feed, FeedBackend};
pub use session::Session;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("post content cannot be empty")]
    EmptyContent,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer; `message` is the server's text, fit for display.
    #[error("{message}")]
    Api { status: u16, message: String },
}

/// Service URL and public API key.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: std::env::var("LINKUP_API_URL")?,
            api_key: std::env::var("LINKUP_API_KEY").ok().filter(|k| !k.is_empty()),
        })
    }
}
