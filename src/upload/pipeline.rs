use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::attachment::{Attachment, AttachmentSource, UploadResult};
use super::progress::{ProgressReporter, UploadProgress};
use super::state::UploadState;
use crate::clock::Clock;
use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::transport::{MediaResponse, MediaTransport, SubmitMode};

/// Takes prepared attachments through submission and server-side processing.
///
/// The pipeline holds no per-attachment state; everything observable lives
/// on the [`Attachment`]. It does not serialize across attachments: the
/// server orders media by submission time, so callers composing one post
/// must not run uploads for it concurrently (see [`super::upload_sequentially`]).
pub struct UploadPipeline<T: MediaTransport, C: Clock> {
    transport: Arc<T>,
    clock: Arc<C>,
    config: UploadConfig,
}

impl<T: MediaTransport, C: Clock> UploadPipeline<T, C> {
    pub fn new(transport: Arc<T>, clock: Arc<C>, config: UploadConfig) -> Self {
        Self {
            transport,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload `attachment`, which must be `Ready`, or `Fail` when `is_retry`.
    ///
    /// A wrong starting state is rejected without touching the attachment.
    /// Any later error is stored on the attachment, moves it to `Fail` and
    /// is returned.
    pub async fn upload(
        &self,
        attachment: &mut Attachment,
        is_retry: bool,
    ) -> Result<UploadResult, UploadError> {
        let required = if is_retry {
            UploadState::Fail
        } else {
            UploadState::Ready
        };
        if attachment.state() != required {
            warn!(
                attachment = %attachment.id(),
                state = ?attachment.state(),
                is_retry,
                "Upload requested from wrong state"
            );
            return Err(UploadError::Precondition {
                state: attachment.state(),
            });
        }

        if is_retry {
            attachment.error = None;
        }
        attachment.result = None;
        attachment.progress().reset(self.config.total_units());
        attachment.transition(UploadState::Uploading)?;

        info!(attachment = %attachment.id(), is_retry, "Uploading attachment");

        match self.upload_media(attachment).await {
            Ok(result) => {
                attachment.result = Some(result.clone());
                attachment.transition(UploadState::Finish)?;
                info!(attachment = %attachment.id(), "Upload finished");
                Ok(result)
            }
            Err(e) => {
                error!(attachment = %attachment.id(), "Upload failed: {}", e);
                attachment.error = Some(e.clone());
                attachment.transition(UploadState::Fail)?;
                Err(e)
            }
        }
    }

    async fn upload_media(&self, attachment: &Attachment) -> Result<UploadResult, UploadError> {
        let progress = attachment.progress();

        if let AttachmentSource::Existing(media) = attachment.source() {
            debug!(media_id = %media.id, "Media already on server");
            progress.complete();
            return Ok(UploadResult::Exists);
        }

        let response = self.submit(attachment, &progress).await?;

        if !response.is_pending() {
            progress.complete();
            return Ok(UploadResult::Uploaded(response.attachment));
        }

        progress.advance_to(self.config.upload_units);
        self.wait_for_processing(&response.attachment.id, &progress)
            .await
    }

    /// Submit on the primary endpoint, falling back once if it 404s
    async fn submit(
        &self,
        attachment: &Attachment,
        progress: &Arc<UploadProgress>,
    ) -> Result<MediaResponse, UploadError> {
        let payload = attachment.output().ok_or(UploadError::MissingOutput)?;
        let reporter = ProgressReporter::new(progress.clone(), 0, self.config.upload_units);

        match self
            .transport
            .submit_media(payload, SubmitMode::Primary, reporter.clone())
            .await
        {
            Ok(response) => Ok(response),
            Err(e) if e.is_not_found() => {
                info!("Primary media endpoint not found, using fallback");
                let response = self
                    .transport
                    .submit_media(payload, SubmitMode::Fallback, reporter)
                    .await?;
                Ok(response)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Poll until the server reports a URL or the retry ceiling is reached
    async fn wait_for_processing(
        &self,
        media_id: &str,
        progress: &UploadProgress,
    ) -> Result<UploadResult, UploadError> {
        let limit = self.config.max_poll_retries;

        for attempt in 1..=limit {
            let media = self.transport.get_media_status(media_id).await?;
            progress.add(self.config.poll_unit);

            if media.is_ready() {
                debug!(media_id, attempt, "Media processing finished");
                progress.complete();
                return Ok(UploadResult::Uploaded(media));
            }

            debug!(media_id, attempt, limit, "Media still processing");
            if attempt < limit {
                self.clock.after(self.config.poll_interval()).await;
            }
        }

        Err(UploadError::ProcessingTimeout { attempts: limit })
    }
}
