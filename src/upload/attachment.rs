//! Media attachments awaiting upload.

use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::progress::UploadProgress;
use super::state::UploadState;
use crate::api_contracts::MediaAttachment;
use crate::error::UploadError;
use crate::transport::MediaPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    fn file_extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Where the attachment's media comes from
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentSource {
    /// Encoded image bytes held in memory
    Image { data: Vec<u8>, format: ImageFormat },
    /// MP4 video on disk, read during preparation
    Video { path: PathBuf },
    /// Media already on the server (e.g. editing an existing post)
    Existing(MediaAttachment),
}

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub enum UploadResult {
    /// The server holds the media and has finished processing it
    Uploaded(MediaAttachment),
    /// Nothing to send, the media was already on the server
    Exists,
}

impl UploadResult {
    pub fn attachment(&self) -> Option<&MediaAttachment> {
        match self {
            UploadResult::Uploaded(media) => Some(media),
            UploadResult::Exists => None,
        }
    }
}

/// One attachment of a post being composed
#[derive(Debug)]
pub struct Attachment {
    id: Uuid,
    source: AttachmentSource,
    caption: String,
    state: UploadState,
    output: Option<MediaPayload>,
    progress: Arc<UploadProgress>,
    pub(crate) error: Option<UploadError>,
    pub(crate) result: Option<UploadResult>,
}

impl Attachment {
    pub fn new(source: AttachmentSource, caption: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            caption: caption.into(),
            state: UploadState::None,
            output: None,
            progress: Arc::new(UploadProgress::new()),
            error: None,
            result: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Also updates an already prepared payload, so an edit made while
    /// `Ready` (or after a failed upload) is sent with the next upload
    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = caption.into();
        let description = caption_description(&self.caption);
        if let Some(output) = self.output.as_mut() {
            output.description = description;
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Shared handle for observers on other tasks
    pub fn progress(&self) -> Arc<UploadProgress> {
        self.progress.clone()
    }

    pub fn fraction_completed(&self) -> f64 {
        self.progress.fraction()
    }

    /// Last recorded failure, cleared when a retry starts
    pub fn error(&self) -> Option<&UploadError> {
        self.error.as_ref()
    }

    pub fn result(&self) -> Option<&UploadResult> {
        self.result.as_ref()
    }

    pub(crate) fn output(&self) -> Option<&MediaPayload> {
        self.output.as_ref()
    }

    /// Produce the upload payload: `None`/`Fail` -> `Compressing` -> `Ready`.
    ///
    /// A read failure moves the attachment to `Fail`, records the error and
    /// returns it.
    pub async fn prepare(&mut self) -> Result<(), UploadError> {
        self.transition(UploadState::Compressing)?;
        self.error = None;

        match self.build_output().await {
            Ok(output) => {
                self.output = output;
                self.transition(UploadState::Ready)
            }
            Err(e) => {
                warn!(attachment = %self.id, "Failed to prepare attachment: {}", e);
                self.error = Some(e.clone());
                self.transition(UploadState::Fail)?;
                Err(e)
            }
        }
    }

    async fn build_output(&self) -> Result<Option<MediaPayload>, UploadError> {
        let description = caption_description(&self.caption);

        let payload = match &self.source {
            AttachmentSource::Image { data, format } => MediaPayload {
                data: Bytes::from(data.clone()),
                filename: format!("image.{}", format.file_extension()),
                mime_type: format.mime_type().to_string(),
                description,
            },
            AttachmentSource::Video { path } => {
                let data = Bytes::from(tokio::fs::read(path).await?);
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("video.mp4")
                    .to_string();
                MediaPayload {
                    data,
                    filename,
                    mime_type: "video/mp4".to_string(),
                    description,
                }
            }
            AttachmentSource::Existing(_) => return Ok(None),
        };

        debug!(
            attachment = %self.id,
            bytes = payload.data.len(),
            mime_type = %payload.mime_type,
            "Attachment prepared"
        );
        Ok(Some(payload))
    }

    /// Single mutation point for `state`
    pub(crate) fn transition(&mut self, next: UploadState) -> Result<(), UploadError> {
        if !self.state.can_enter(next) {
            return Err(UploadError::Precondition { state: self.state });
        }
        debug!(attachment = %self.id, from = ?self.state, to = ?next, "Upload transition");
        self.state = next;
        Ok(())
    }
}

/// Trimmed caption, `None` when blank
fn caption_description(caption: &str) -> Option<String> {
    let trimmed = caption.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
