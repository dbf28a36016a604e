//! Client-side building blocks for a Mastodon-compatible instance: a
//! cursor-paginated feed state machine and a media upload pipeline with
//! server-side processing polls.

pub mod api_client;
pub mod api_contracts;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod transport;
pub mod types;
pub mod upload;

#[cfg(test)]
mod test_harness;

pub use api_client::MastodonClient;
pub use clock::{Clock, TokioClock};
pub use config::{ClientConfig, FeedConfig, UploadConfig};
pub use error::{ApiError, ConfigError, FeedError, UploadError};
pub use feed::{FeedEvent, FeedPaginator, FeedState};
pub use transport::{MediaPayload, MediaResponse, MediaTransport, Page, PageSource, SubmitMode};
pub use types::{AuthenticationBox, Cursor};
pub use upload::{
    upload_sequentially, Attachment, AttachmentSource, BatchUpload, ImageFormat,
    ProgressReporter, UploadPipeline, UploadProgress, UploadResult, UploadState,
};
