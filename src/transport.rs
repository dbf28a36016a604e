//! Network seams consumed by the paginator and the upload pipeline.
//!
//! Implementations perform authenticated requests and return either a typed
//! value or an [`ApiError`] carrying the HTTP status.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

use crate::api_contracts::MediaAttachment;
use crate::error::ApiError;
use crate::upload::ProgressReporter;

/// One page of a cursor-paginated feed
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    /// Boundary for the following page, `None` when the server reports none
    pub next_cursor: Option<C>,
}

/// Source of cursor-paginated items
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Item identity is `PartialEq`
    type Item: Clone + PartialEq + Debug + Send + Sync;
    type Cursor: Clone + Ord + Debug + Send + Sync;

    /// Fetch the page starting at `cursor` (`None` = first page)
    async fn fetch_page(
        &self,
        cursor: Option<Self::Cursor>,
    ) -> Result<Page<Self::Item, Self::Cursor>, ApiError>;
}

/// Which media endpoint to submit to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Asynchronous-processing endpoint (may answer 202)
    Primary,
    /// Legacy synchronous endpoint for servers that 404 on the primary one
    Fallback,
}

/// Bytes ready to be sent to the server
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPayload {
    /// Cheap to clone and slice, so uploads stream it without copying
    pub data: Bytes,
    pub filename: String,
    pub mime_type: String,
    /// Trimmed caption, `None` when empty
    pub description: Option<String>,
}

/// Result of a media submission
#[derive(Debug, Clone, PartialEq)]
pub struct MediaResponse {
    pub status: u16,
    pub attachment: MediaAttachment,
}

impl MediaResponse {
    /// 202: the server accepted the media but is still processing it
    pub fn is_pending(&self) -> bool {
        self.status == 202
    }
}

/// Media endpoints used by the upload pipeline
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn submit_media(
        &self,
        payload: &MediaPayload,
        mode: SubmitMode,
        progress: ProgressReporter,
    ) -> Result<MediaResponse, ApiError>;

    async fn get_media_status(&self, id: &str) -> Result<MediaAttachment, ApiError>;
}
