//! Recognition data types shared across the pipeline

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Foreground/background colour reported for a text span
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextColor {
    #[serde(default)]
    pub fg: Vec<u8>,
    #[serde(default)]
    pub bg: Vec<u8>,
}

/// One recognised text span with its axis-aligned box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDetection {
    /// Recognised (or translated) text
    pub text: String,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Language code reported by the service
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub text_color: Option<TextColor>,
}

impl TextDetection {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Box as a rectangle in whatever space the detection is expressed in
    pub fn bounds(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.width(), self.height())
    }
}

/// Whether the service should only read text or also translate it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionMode {
    Recognize,
    Translate { target_language: String },
}

/// Payload for one recognition call
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionRequest {
    /// PNG-encoded crop
    pub image_png: Vec<u8>,
    pub mode: RecognitionMode,
}

/// Post-processed service response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    /// Detections in recognition space
    pub detections: Vec<TextDetection>,
    /// Size of the sample the service ran detection on, if reported
    pub detection_size: Option<f64>,
}
