use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api_contracts::{MediaAttachment, TrendLink};
use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError};
use crate::transport::{MediaPayload, MediaResponse, MediaTransport, Page, PageSource, SubmitMode};
use crate::types::{AuthenticationBox, Cursor};
use crate::upload::ProgressReporter;

/// API client for a Mastodon-compatible instance
pub struct MastodonClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
    page_limit: Option<u32>,
    chunk_size: usize,
}

impl MastodonClient {
    /// Create a client for the session's instance
    pub fn new(auth: &AuthenticationBox, config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: auth.base_url(),
            access_token: auth.access_token.clone(),
            client,
            page_limit: config.feed.page_limit,
            chunk_size: config.upload.chunk_size.max(1),
        }
    }

    /// Create a client for the instance named in `config`
    pub fn from_config(access_token: &str, config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(&config.session(access_token)?, config))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn media_url(&self, mode: SubmitMode) -> String {
        match mode {
            SubmitMode::Primary => self.api_url("v2/media"),
            SubmitMode::Fallback => self.api_url("v1/media"),
        }
    }

    /// Fetch one page of trending links starting at `offset`
    pub async fn trend_links(&self, offset: Option<Cursor>) -> Result<Page<TrendLink, Cursor>, ApiError> {
        let mut url = reqwest::Url::parse(&self.api_url("v1/trends/links"))
            .map_err(|e| ApiError::network(format!("Invalid base URL: {}", e)))?;

        if offset.is_some() || self.page_limit.is_some() {
            let mut query_pairs = url.query_pairs_mut();
            if let Some(offset) = offset {
                query_pairs.append_pair("offset", &offset.to_string());
            }
            if let Some(limit) = self.page_limit {
                query_pairs.append_pair("limit", &limit.to_string());
            }
        }

        debug!(%url, "Fetching trending links");

        let response = self.client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let next_cursor = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_offset_from_link_header);

        let (_, items) = read_json::<Vec<TrendLink>>(response).await?;
        Ok(Page { items, next_cursor })
    }

    /// Upload media as multipart form data, streaming the file in chunks
    pub async fn upload_media(
        &self,
        payload: &MediaPayload,
        mode: SubmitMode,
        progress: ProgressReporter,
    ) -> Result<MediaResponse, ApiError> {
        let url = self.media_url(mode);
        let total = payload.data.len() as u64;

        let data = payload.data.clone();
        let chunk_size = self.chunk_size;
        let chunks = (0..data.len())
            .step_by(chunk_size)
            .map(move |start| data.slice(start..(start + chunk_size).min(data.len())));
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress.report(sent, total);
            Ok::<_, std::io::Error>(chunk)
        });

        let part = reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(payload.filename.clone())
            .mime_str(&payload.mime_type)
            .map_err(|e| ApiError::network(format!("Invalid mime type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(description) = &payload.description {
            form = form.text("description", description.clone());
        }

        debug!(%url, bytes = total, ?mode, "Submitting media");

        let response = self.client
            .post(&url)
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let (status, attachment) = read_json::<MediaAttachment>(response).await?;
        Ok(MediaResponse { status, attachment })
    }

    /// Get a media attachment; Mastodon answers 206 while it is still processing
    pub async fn get_media(&self, id: &str) -> Result<MediaAttachment, ApiError> {
        let url = self.api_url(&format!("v1/media/{}", id));

        let response = self.client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let (_, attachment) = read_json::<MediaAttachment>(response).await?;
        Ok(attachment)
    }
}

#[async_trait]
impl PageSource for MastodonClient {
    type Item = TrendLink;
    type Cursor = Cursor;

    async fn fetch_page(&self, cursor: Option<Cursor>) -> Result<Page<TrendLink, Cursor>, ApiError> {
        self.trend_links(cursor).await
    }
}

#[async_trait]
impl MediaTransport for MastodonClient {
    async fn submit_media(
        &self,
        payload: &MediaPayload,
        mode: SubmitMode,
        progress: ProgressReporter,
    ) -> Result<MediaResponse, ApiError> {
        self.upload_media(payload, mode, progress).await
    }

    async fn get_media_status(&self, id: &str) -> Result<MediaAttachment, ApiError> {
        self.get_media(id).await
    }
}

/// Decode a 2xx body, or turn anything else into an `ApiError` with its status
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<(u16, T), ApiError> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ApiError::from_response_parts(status.as_u16(), &error_text));
    }

    let data = response
        .json::<T>()
        .await
        .map_err(|e| ApiError::network(format!("Failed to parse response: {}", e)))?;

    Ok((status.as_u16(), data))
}

/// Extract the `offset` query parameter of the `rel="next"` link
fn next_offset_from_link_header(header: &str) -> Option<Cursor> {
    header.split(',').find_map(|entry| {
        let (target, params) = entry.trim().split_once(';')?;
        let is_next = params.split(';').any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if !is_next {
            return None;
        }

        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let url = reqwest::Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "offset")
            .and_then(|(_, value)| value.parse().ok())
    })
}
