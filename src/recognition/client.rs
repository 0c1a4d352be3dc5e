//! HTTP client for the recognition service
//!
//! Posts the crop as a multipart `image` field to `/get_text`, or to
//! `/translate` together with a `target_language` field.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};
use uuid::Uuid;

use super::text::{Passthrough, ScriptNormalizer, SimplifiedChinese};
use super::types::{RecognitionMode, RecognitionRequest, RecognitionResult};
use super::wire::ServiceResponse;
use super::{RecognitionError, RecognitionService};
use crate::config::RecognitionSettings;

/// Recognition service reached over HTTP
pub struct HttpRecognitionClient {
    client: reqwest::Client,
    base_url: String,
    normalizer: Box<dyn ScriptNormalizer>,
}

impl HttpRecognitionClient {
    /// Build a client from settings
    pub fn new(settings: &RecognitionSettings) -> Result<Self, RecognitionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let normalizer: Box<dyn ScriptNormalizer> = if settings.normalize_script {
            Box::new(SimplifiedChinese)
        } else {
            Box::new(Passthrough)
        };

        Ok(Self {
            client,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            normalizer,
        })
    }

    /// Endpoint URL for a recognition mode
    pub fn endpoint(&self, mode: &RecognitionMode) -> String {
        match mode {
            RecognitionMode::Recognize => format!("{}/get_text", self.base_url),
            RecognitionMode::Translate { .. } => format!("{}/translate", self.base_url),
        }
    }
}

#[async_trait]
impl RecognitionService for HttpRecognitionClient {
    async fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResult, RecognitionError> {
        let url = self.endpoint(&request.mode);
        let bytes = request.image_png.len();

        let part = Part::bytes(request.image_png)
            .file_name(format!("{}.png", Uuid::new_v4()))
            .mime_str("image/png")?;
        let mut form = Form::new().part("image", part);
        if let RecognitionMode::Translate { target_language } = &request.mode {
            form = form.text("target_language", target_language.clone());
        }

        debug!("Posting {} byte crop to {}", bytes, url);
        let start = Instant::now();

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Recognition service returned {}: {}", status, body);
            return Err(RecognitionError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        debug!("Recognition response: {} bytes in {:?}", body.len(), start.elapsed());

        let parsed: ServiceResponse = serde_json::from_slice(&body)?;
        parsed.into_result(self.normalizer.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP request with a canned response.
    /// Resolves to the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&received);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&received).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn settings(endpoint: String) -> RecognitionSettings {
        RecognitionSettings {
            endpoint,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    fn request(mode: RecognitionMode) -> RecognitionRequest {
        RecognitionRequest {
            image_png: vec![0x89, b'P', b'N', b'G'],
            mode,
        }
    }

    #[tokio::test]
    async fn test_recognize_posts_multipart_image() {
        let body = r#"{"details": [
            {"text": {"originalText": "漢字"}, "minX": 1, "minY": 2, "maxX": 3, "maxY": 4, "language": "CHT"},
            {"text": {"originalText": "ABC123"}, "minX": 0, "minY": 0, "maxX": 1, "maxY": 1}
        ], "detection_size": 64}"#;
        let (url, server) = serve_once("HTTP/1.1 200 OK", body).await;

        let client = HttpRecognitionClient::new(&settings(url)).unwrap();
        let result = client.recognize(request(RecognitionMode::Recognize)).await.unwrap();

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].text, "汉字");
        assert_eq!(result.detection_size, Some(64.0));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /get_text"));
        assert!(raw.contains("name=\"image\""));
        assert!(!raw.contains("target_language"));
    }

    #[tokio::test]
    async fn test_translate_sends_target_language() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"details": []}"#).await;

        let client = HttpRecognitionClient::new(&settings(url)).unwrap();
        let result = client
            .recognize(request(RecognitionMode::Translate {
                target_language: "ENG".to_string(),
            }))
            .await
            .unwrap();
        assert!(result.detections.is_empty());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /translate"));
        assert!(raw.contains("name=\"target_language\""));
        assert!(raw.contains("ENG"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (url, server) = serve_once("HTTP/1.1 502 Bad Gateway", r#"{"error": "down"}"#).await;

        let client = HttpRecognitionClient::new(&settings(url)).unwrap();
        let err = client.recognize(request(RecognitionMode::Recognize)).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Status { code: 502, .. }));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_in_band_500_is_error() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"status": 500}"#).await;

        let client = HttpRecognitionClient::new(&settings(url)).unwrap();
        let err = client.recognize(request(RecognitionMode::Recognize)).await.unwrap_err();
        assert!(matches!(err, RecognitionError::ServiceFailure));

        server.await.unwrap();
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = HttpRecognitionClient::new(&settings("http://localhost:5003/".to_string())).unwrap();
        assert_eq!(client.endpoint(&RecognitionMode::Recognize), "http://localhost:5003/get_text");
    }
}
