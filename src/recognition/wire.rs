//! JSON schema of the recognition service response

use serde::Deserialize;
use tracing::debug;

use super::text::{is_alphanumeric_noise, ScriptNormalizer};
use super::types::{RecognitionResult, TextColor, TextDetection};
use super::RecognitionError;

/// Raw response body
#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    #[serde(default)]
    pub details: Vec<WireDetail>,
    #[serde(default)]
    pub detection_size: Option<f64>,
    /// Some deployments report failures in-band with `status: 500`
    #[serde(default)]
    pub status: Option<i64>,
}

/// Text field of a detail, structured or plain
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireText {
    Structured {
        #[serde(rename = "originalText")]
        original_text: String,
    },
    Plain(String),
}

impl WireText {
    fn into_string(self) -> String {
        match self {
            WireText::Structured { original_text } => original_text,
            WireText::Plain(text) => text,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDetail {
    pub text: WireText,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    #[serde(default)]
    pub text_color: Option<TextColor>,
    #[serde(default)]
    pub language: Option<String>,
}

impl ServiceResponse {
    /// Check the in-band status, normalize text and drop noise spans
    pub fn into_result(self, normalizer: &dyn ScriptNormalizer) -> Result<RecognitionResult, RecognitionError> {
        if self.status == Some(500) {
            return Err(RecognitionError::ServiceFailure);
        }

        let total = self.details.len();
        let detections: Vec<TextDetection> = self
            .details
            .into_iter()
            .map(|detail| TextDetection {
                text: normalizer.normalize(&detail.text.into_string()),
                min_x: detail.min_x,
                min_y: detail.min_y,
                max_x: detail.max_x,
                max_y: detail.max_y,
                language: detail.language,
                text_color: detail.text_color,
            })
            .filter(|d| !is_alphanumeric_noise(&d.text))
            .collect();

        debug!("Recognition response: kept {} of {} spans", detections.len(), total);

        Ok(RecognitionResult {
            detections,
            detection_size: self.detection_size,
        })
    }
}
