//! Sequential upload of all attachments belonging to one post.
//!
//! The server appends media in submission order, so the attachments of a
//! post are uploaded one after another and the batch stops at the first
//! failure.

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::attachment::{Attachment, UploadResult};
use super::pipeline::UploadPipeline;
use super::state::UploadState;
use crate::clock::Clock;
use crate::error::UploadError;
use crate::transport::MediaTransport;

/// Result of uploading a batch of attachments
#[derive(Debug)]
pub struct BatchUpload {
    /// Results in attachment order, up to the first failure
    pub results: Vec<UploadResult>,
    /// The attachment that stopped the batch and why
    pub failed: Option<(Uuid, UploadError)>,
}

impl BatchUpload {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// Upload `attachments` in order.
///
/// Finished attachments are skipped and keep their earlier result, failed
/// ones are retried, ready ones are uploaded fresh. Anything else stops the
/// batch with a precondition error.
pub async fn upload_sequentially<T: MediaTransport, C: Clock>(
    pipeline: &UploadPipeline<T, C>,
    attachments: &mut [Attachment],
) -> BatchUpload {
    let total = attachments.len();
    let mut results = Vec::with_capacity(total);

    info!("Uploading {} attachment(s) sequentially", total);

    for (index, attachment) in attachments.iter_mut().enumerate() {
        let finished = match attachment.state() {
            UploadState::Finish => attachment.result().cloned(),
            _ => None,
        };
        let outcome = match finished {
            Some(result) => Ok(result),
            None => upload_one(pipeline, attachment).await,
        };

        match outcome {
            Ok(result) => {
                info!("[{}/{}] Attachment {} uploaded", index + 1, total, attachment.id());
                results.push(result);
            }
            Err(e) => {
                warn!("[{}/{}] Attachment {} failed: {}", index + 1, total, attachment.id(), e);
                return BatchUpload {
                    results,
                    failed: Some((attachment.id(), e)),
                };
            }
        }
    }

    BatchUpload {
        results,
        failed: None,
    }
}

/// Fresh upload, retry, or, when preparation itself failed, prepare again first
async fn upload_one<T: MediaTransport, C: Clock>(
    pipeline: &UploadPipeline<T, C>,
    attachment: &mut Attachment,
) -> Result<UploadResult, UploadError> {
    match attachment.state() {
        UploadState::Fail if attachment.output().is_none() => {
            debug!(attachment = %attachment.id(), "Preparing failed attachment again");
            attachment.prepare().await?;
            pipeline.upload(attachment, false).await
        }
        UploadState::Fail => pipeline.upload(attachment, true).await,
        _ => pipeline.upload(attachment, false).await,
    }
}
