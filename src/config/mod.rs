//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Drawing surface settings
    pub surface: SurfaceSettings,
    /// Recognition region settings
    pub selection: SelectionSettings,
    /// Recognition service settings
    pub recognition: RecognitionSettings,
    /// Pencil tool settings
    pub pencil: PencilSettings,
}

/// Drawing surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Smallest zoom factor
    pub zoom_min: f64,
    /// Largest zoom factor
    pub zoom_max: f64,
    /// Allow wheel zoom
    pub enable_zoom: bool,
    /// Allow alt+drag panning
    pub enable_pan: bool,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            zoom_min: 1.0,
            zoom_max: 20.0,
            enable_zoom: true,
            enable_pan: true,
        }
    }
}

/// Recognition region settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Stroke width of the drawn rectangle, removed before cropping
    pub stroke_width: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self { stroke_width: 2.0 }
    }
}

/// How the service's `detection_size` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSizeMode {
    /// Coordinates are already in crop pixels
    #[default]
    Ignore,
    /// `detection_size` is the height of the sample the service recognised
    Height,
}

impl DetectionSizeMode {
    /// Recognised sample height to use for back-scaling
    pub fn recognized_height(self, detection_size: Option<f64>) -> Option<f64> {
        match self {
            DetectionSizeMode::Ignore => None,
            DetectionSizeMode::Height => detection_size,
        }
    }
}

/// Recognition service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Base URL of the service
    pub endpoint: String,
    /// Translate instead of plain recognition
    pub translate: bool,
    /// Target language for translation
    pub target_language: String,
    /// Request timeout
    pub timeout_secs: u64,
    /// Convert traditional Chinese to simplified
    pub normalize_script: bool,
    /// Interpretation of `detection_size`
    pub detection_size: DetectionSizeMode,
    /// Largest crop edge that will be submitted
    pub max_crop_dimension: u32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5003".to_string(),
            translate: false,
            target_language: "CHS".to_string(),
            timeout_secs: 60,
            normalize_script: true,
            detection_size: DetectionSizeMode::Ignore,
            max_crop_dimension: 8192,
        }
    }
}

/// Pencil tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PencilSettings {
    /// Brush colour
    pub color: String,
    /// Brush width
    pub width: f64,
}

impl Default for PencilSettings {
    fn default() -> Self {
        Self {
            color: "#ff0000".to_string(),
            width: 20.0,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: AppConfig = toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
