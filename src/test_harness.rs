//! Integration test harness for a mock Mastodon server
//!
//! Runs the HTTP client, the paginator and the upload pipeline against
//! mockito instead of a real instance.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

use crate::api_client::MastodonClient;
use crate::config::ClientConfig;
use crate::types::AuthenticationBox;

/// A test harness that sets up a mock Mastodon instance
pub struct TestHarness {
    pub server: ServerGuard,
}

impl TestHarness {
    /// Create a new test harness with a mock server
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    /// Get the mock server URL
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Client pointed at the mock server
    pub fn client(&self) -> MastodonClient {
        MastodonClient::new(
            &AuthenticationBox::new(self.url(), "test-access-token"),
            &ClientConfig::default(),
        )
    }

    /// Mock GET /api/v1/trends/links for `offset`, advertising `next` in the Link header
    pub fn mock_trend_links(&mut self, offset: Option<u64>, urls: &[&str], next: Option<u64>) -> Mock {
        let query = match offset {
            Some(offset) => Matcher::UrlEncoded("offset".to_string(), offset.to_string()),
            None => Matcher::Exact(String::new()),
        };
        let links: Vec<serde_json::Value> = urls
            .iter()
            .map(|url| json!({
                "url": url,
                "title": format!("Title of {}", url),
                "description": "",
                "type": "link",
                "provider_name": "Example News",
                "image": null,
                "history": []
            }))
            .collect();

        let mut mock = self.server.mock("GET", "/api/v1/trends/links")
            .match_query(query)
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json");

        if let Some(next) = next {
            let base = self.url();
            mock = mock.with_header(
                "link",
                &format!(
                    r#"<{base}/api/v1/trends/links?offset={next}>; rel="next", <{base}/api/v1/trends/links?offset=0>; rel="prev""#
                ),
            );
        }

        mock.with_body(json!(links).to_string()).create()
    }

    /// Mock a media submission on `path` (`/api/v2/media` or `/api/v1/media`)
    pub fn mock_media_upload(&mut self, path: &str, status: usize, id: &str, url: Option<&str>) -> Mock {
        self.server.mock("POST", path)
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .match_header("content-type", Matcher::Regex(r"multipart/form-data; boundary=.+".to_string()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(media_json(id, url).to_string())
            .create()
    }

    /// Mock GET /api/v1/media/:id answering `times` times
    pub fn mock_media_status(&mut self, id: &str, url: Option<&str>, times: usize) -> Mock {
        let status = if url.is_some() { 200 } else { 206 };
        self.server.mock("GET", format!("/api/v1/media/{}", id).as_str())
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(media_json(id, url).to_string())
            .expect(times)
            .create()
    }

    /// Mock an error response with a Mastodon error body
    pub fn mock_error(&mut self, method: &str, path: &str, status: usize, message: &str) -> Mock {
        self.server.mock(method, path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "error": message }).to_string())
            .create()
    }
}

fn media_json(id: &str, url: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "type": "image",
        "url": url,
        "preview_url": format!("https://files.example/small/{}.png", id),
        "remote_url": null,
        "description": null,
        "blurhash": null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::RecordingClock;
    use crate::config::{FeedConfig, UploadConfig};
    use crate::error::UploadError;
    use crate::feed::{FeedPaginator, FeedState};
    use crate::transport::{MediaPayload, SubmitMode};
    use crate::upload::{
        Attachment, AttachmentSource, ImageFormat, ProgressReporter, UploadPipeline,
        UploadProgress, UploadState,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn payload() -> MediaPayload {
        MediaPayload {
            data: vec![0u8; 3000].into(),
            filename: "image.png".to_string(),
            mime_type: "image/png".to_string(),
            description: Some("A test image".to_string()),
        }
    }

    async fn ready_attachment() -> Attachment {
        let mut attachment = Attachment::new(
            AttachmentSource::Image {
                data: vec![0x89, b'P', b'N', b'G'],
                format: ImageFormat::Png,
            },
            "alt text",
        );
        attachment.prepare().await.unwrap();
        attachment
    }

    #[tokio::test]
    async fn test_trend_links_with_next_cursor() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_trend_links(None, &["https://a.example", "https://b.example"], Some(2));

        let page = harness.client().trend_links(None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].url, "https://a.example");
        assert_eq!(page.next_cursor, Some(2));
    }

    #[tokio::test]
    async fn test_trend_links_sends_offset() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_trend_links(Some(20), &["https://c.example"], None);

        let page = harness.client().trend_links(Some(20)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_trend_links_not_found() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_error("GET", "/api/v1/trends/links", 404, "Not Found");

        let err = harness.client().trend_links(None).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.message, "Not Found");
    }

    #[tokio::test]
    async fn test_upload_media_primary() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_media_upload("/api/v2/media", 200, "42", Some("https://files.example/42.png"));
        let progress = Arc::new(UploadProgress::new());
        progress.reset(600);

        let response = harness
            .client()
            .upload_media(&payload(), SubmitMode::Primary, ProgressReporter::new(progress.clone(), 0, 540))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert!(!response.is_pending());
        assert!(response.attachment.is_ready());
        assert_eq!(progress.completed(), 540);
    }

    #[tokio::test]
    async fn test_upload_media_streams_in_chunks() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_media_upload("/api/v2/media", 200, "46", Some("https://files.example/46.png"));
        let mut config = ClientConfig::default();
        config.upload.chunk_size = 1000;
        let client = MastodonClient::new(&AuthenticationBox::new(harness.url(), "test-access-token"), &config);
        let progress = Arc::new(UploadProgress::new());
        progress.reset(600);

        let response = client
            .upload_media(&payload(), SubmitMode::Primary, ProgressReporter::new(progress.clone(), 0, 540))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.attachment.id, "46");
        assert_eq!(progress.completed(), 540);
    }

    #[tokio::test]
    async fn test_upload_media_fallback_endpoint() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_media_upload("/api/v1/media", 200, "43", Some("https://files.example/43.png"));
        let progress = Arc::new(UploadProgress::new());

        let response = harness
            .client()
            .upload_media(&payload(), SubmitMode::Fallback, ProgressReporter::new(progress, 0, 540))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.attachment.id, "43");
    }

    #[tokio::test]
    async fn test_upload_media_accepted_pending() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_media_upload("/api/v2/media", 202, "44", None);
        let progress = Arc::new(UploadProgress::new());

        let response = harness
            .client()
            .upload_media(&payload(), SubmitMode::Primary, ProgressReporter::new(progress, 0, 540))
            .await
            .unwrap();

        assert!(response.is_pending());
        assert!(!response.attachment.is_ready());
    }

    #[tokio::test]
    async fn test_upload_media_unauthorized() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_error("POST", "/api/v2/media", 401, "The access token is invalid");
        let progress = Arc::new(UploadProgress::new());

        let err = harness
            .client()
            .upload_media(&payload(), SubmitMode::Primary, ProgressReporter::new(progress, 0, 540))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_get_media_processing() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_media_status("45", None, 1);

        let media = harness.client().get_media("45").await.unwrap();

        assert_eq!(media.id, "45");
        assert!(!media.is_ready());
    }

    #[tokio::test]
    async fn test_paginator_against_server() {
        let mut harness = TestHarness::new().await;
        let _first = harness.mock_trend_links(None, &["https://a.example", "https://b.example"], Some(2));
        let _second = harness.mock_trend_links(Some(2), &["https://b.example", "https://c.example"], Some(4));
        let _third = harness.mock_trend_links(Some(4), &["https://c.example"], Some(6));

        let clock = Arc::new(RecordingClock::default());
        let mut feed = FeedPaginator::new(Arc::new(harness.client()), clock, FeedConfig::default());

        feed.start_reload().await.unwrap();
        assert_eq!(feed.state(), &FeedState::Idle);

        feed.load_more().await.unwrap();
        assert_eq!(feed.state(), &FeedState::Idle);
        assert_eq!(feed.items().len(), 3);

        feed.load_more().await.unwrap();
        assert_eq!(feed.state(), &FeedState::NoMore);
        assert_eq!(feed.cursor(), Some(&6));
    }

    #[tokio::test]
    async fn test_paginator_unsupported_endpoint() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_error("GET", "/api/v1/trends/links", 404, "Not Found");

        let clock = Arc::new(RecordingClock::default());
        let mut feed = FeedPaginator::new(Arc::new(harness.client()), clock.clone(), FeedConfig::default());
        feed.start_reload().await.unwrap();

        assert_eq!(feed.state(), &FeedState::NoMore);
        assert!(feed.is_endpoint_unsupported());
        assert!(clock.delays().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_falls_back_then_finishes() {
        let mut harness = TestHarness::new().await;
        let primary = harness.mock_error("POST", "/api/v2/media", 404, "Not Found");
        let fallback = harness.mock_media_upload("/api/v1/media", 200, "50", Some("https://files.example/50.png"));

        let clock = Arc::new(RecordingClock::default());
        let pipeline = UploadPipeline::new(Arc::new(harness.client()), clock, UploadConfig::default());
        let mut attachment = ready_attachment().await;

        let result = pipeline.upload(&mut attachment, false).await.unwrap();

        primary.assert_async().await;
        fallback.assert_async().await;
        assert_eq!(result.attachment().unwrap().id, "50");
        assert_eq!(attachment.state(), UploadState::Finish);
        assert_eq!(attachment.fraction_completed(), 1.0);
    }

    #[tokio::test]
    async fn test_pipeline_polls_until_processed() {
        let mut harness = TestHarness::new().await;
        let _upload = harness.mock_media_upload("/api/v2/media", 202, "51", None);
        let processing = harness.mock_media_status("51", None, 2);
        let ready = harness.mock_media_status("51", Some("https://files.example/51.png"), 1);

        let clock = Arc::new(RecordingClock::default());
        let pipeline = UploadPipeline::new(Arc::new(harness.client()), clock.clone(), UploadConfig::default());
        let mut attachment = ready_attachment().await;

        let result = pipeline.upload(&mut attachment, false).await.unwrap();

        processing.assert_async().await;
        ready.assert_async().await;
        assert!(result.attachment().unwrap().is_ready());
        assert_eq!(clock.delays(), vec![Duration::from_secs(3); 2]);
        assert_eq!(attachment.progress().completed(), 600);
    }

    #[tokio::test]
    async fn test_pipeline_processing_timeout() {
        let mut harness = TestHarness::new().await;
        let _upload = harness.mock_media_upload("/api/v2/media", 202, "52", None);
        let _processing = harness.mock_media_status("52", None, 3);

        let clock = Arc::new(RecordingClock::default());
        let config = UploadConfig {
            max_poll_retries: 3,
            ..UploadConfig::default()
        };
        let pipeline = UploadPipeline::new(Arc::new(harness.client()), clock.clone(), config);
        let mut attachment = ready_attachment().await;

        let err = pipeline.upload(&mut attachment, false).await.unwrap_err();

        assert!(matches!(err, UploadError::ProcessingTimeout { attempts: 3 }));
        assert_eq!(clock.delays().len(), 2);
        assert_eq!(attachment.state(), UploadState::Fail);
    }
}
