//! Core types shared by the feed and upload components.
//!
//! The credential handle is opaque to everything except the HTTP client:
//! session storage lives outside this crate.

/// Cursor used by the trending-links feed (a numeric offset).
pub type Cursor = u64;

/// Authenticated session for one Mastodon-compatible instance
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AuthenticationBox {
    /// Instance domain, e.g. `mastodon.social`
    pub domain: String,
    pub access_token: String,
}

impl AuthenticationBox {
    pub fn new(domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            access_token: access_token.into(),
        }
    }

    /// Base URL for API calls. A domain that already carries a scheme
    /// (local test servers) is used as-is.
    pub fn base_url(&self) -> String {
        if self.domain.starts_with("http://") || self.domain.starts_with("https://") {
            self.domain.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.domain.trim_end_matches('/'))
        }
    }
}
