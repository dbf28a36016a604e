//! Error types for the feed, upload and configuration layers.

use std::sync::Arc;

use thiserror::Error;

use crate::api_contracts::ErrorResponse;
use crate::upload::UploadState;

/// Failure reported by a transport call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", self.describe())]
pub struct ApiError {
    /// HTTP status, `None` when no response was received
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Build from a non-success response, preferring Mastodon's `{"error": ...}` body
    pub fn from_response_parts(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.trim().to_string());
        Self::http(status, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    fn describe(&self) -> String {
        match self.status {
            Some(status) => format!("Server error {}: {}", status, self.message),
            None => format!("Network error: {}", self.message),
        }
    }
}

/// Errors from driving a feed paginator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("illegal feed transition from {from} to {to}")]
    IllegalTransition { from: &'static str, to: &'static str },
}

/// Errors from preparing or uploading an attachment
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("upload not allowed while attachment is {state:?}")]
    Precondition { state: UploadState },

    #[error("attachment has no prepared output")]
    MissingOutput,

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server never reported the media as processed
    #[error("bad request: media still processing after {attempts} status checks")]
    ProcessingTimeout { attempts: u32 },

    #[error("failed to read media: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Io(Arc::new(e))
    }
}

/// Errors from reading or writing the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find config directory")]
    NoConfigDir,

    #[error("no instance configured")]
    NoInstance,

    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
