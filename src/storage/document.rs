//! Annotation document snapshots
//!
//! A document is the placed image, every drawable object (rasters embedded
//! as PNG data URLs) and the accumulated results, saved as JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::ImagePlacement;
use crate::results::ResultStore;
use crate::surface::SurfaceObject;

/// Saved state of one annotation document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Placement of the loaded image, if any
    pub placement: Option<ImagePlacement>,
    /// Surface objects, bottom to top
    pub objects: Vec<SurfaceObject>,
    /// Detections in original-image space
    pub results: ResultStore,
}

/// Load a document from file
pub fn load_document(path: &Path) -> Result<DocumentSnapshot> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document: DocumentSnapshot =
        serde_json::from_str(&content).with_context(|| format!("Invalid document {}", path.display()))?;
    Ok(document)
}

/// Save a document to file
pub fn save_document(document: &DocumentSnapshot, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(document)?;
    std::fs::write(path, content)?;
    Ok(())
}
