//! Recognition Service
//!
//! The service itself is remote and opaque. This module owns the trait the
//! session controller talks to, the HTTP implementation, the response
//! schema and the text post-processing applied to every span.

pub mod client;
pub mod text;
pub mod types;
pub mod wire;

pub use client::HttpRecognitionClient;
pub use text::{Passthrough, ScriptNormalizer, SimplifiedChinese};
pub use types::{RecognitionMode, RecognitionRequest, RecognitionResult, TextColor, TextDetection};

use async_trait::async_trait;
use thiserror::Error;

/// Failures of a recognition call
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("recognition service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("recognition service reported an internal failure")]
    ServiceFailure,
    #[error("could not decode recognition response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can turn a cropped raster into text detections
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// Recognise text in the request image.
    ///
    /// Detections come back in recognition space and already have their
    /// text normalized and noise spans removed.
    async fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResult, RecognitionError>;
}
