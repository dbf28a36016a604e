/**
 * API Contract Types for the Mastodon REST API
 *
 * These types mirror the JSON entities returned by Mastodon-compatible
 * servers for the endpoints this crate talks to:
 * - GET  /api/v1/trends/links
 * - POST /api/v2/media, POST /api/v1/media
 * - GET  /api/v1/media/:id
 *
 * Principles:
 * - Unknown fields are ignored, servers add fields over time
 * - Nullable fields are explicit Option<T>
 * - Enumerations tolerate values newer than this client (`Unknown`)
 */

use serde::{Deserialize, Serialize};

// =============================================================================
// Media Attachment
// =============================================================================

/// Remote media attachment descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Null while the server is still processing the media
    pub url: Option<String>,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub blurhash: Option<String>,
    #[serde(default)]
    pub meta: Option<MediaMeta>,
}

impl MediaAttachment {
    /// The server finished processing once a resolvable URL is present
    pub fn is_ready(&self) -> bool {
        self.url.as_deref().map(|u| !u.is_empty()).unwrap_or(false)
    }
}

/// Media type reported by the server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Gifv,
    Video,
    Audio,
    #[serde(other)]
    Unknown,
}

/// Dimension metadata (subset)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MediaMeta {
    #[serde(default)]
    pub original: Option<MediaDimensions>,
    #[serde(default)]
    pub small: Option<MediaDimensions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MediaDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
}

// =============================================================================
// Trending Links
// =============================================================================

/// A trending news link. Two links are the same item when their URLs match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendLink {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub history: Vec<TrendHistory>,
}

impl PartialEq for TrendLink {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

/// Daily usage counts; Mastodon serialises the numbers as strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendHistory {
    pub day: String,
    pub uses: String,
    pub accounts: String,
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned by Mastodon on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
