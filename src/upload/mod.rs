//! Media attachment uploads.
//!
//! An [`Attachment`] is prepared locally, then handed to the
//! [`UploadPipeline`], which submits it, waits out asynchronous server-side
//! processing and records progress, state and errors on the attachment.

mod attachment;
mod batch;
mod pipeline;
mod progress;
mod state;

pub use attachment::{Attachment, AttachmentSource, ImageFormat, UploadResult};
pub use batch::{upload_sequentially, BatchUpload};
pub use pipeline::UploadPipeline;
pub use progress::{ProgressReporter, UploadProgress};
pub use state::UploadState;
