//! Region bookkeeping for one in-flight recognition call
//!
//! A detection returned for a cropped region is expressed relative to the
//! crop as the service saw it. Getting it back into original-image space
//! takes two corrections applied together:
//! 1. undo any resizing the service applied to the crop internally
//!    (`requested_height / recognized_height`)
//! 2. re-express the crop-local position relative to the whole image,
//!    then undo the display scale of the placement

use serde::{Deserialize, Serialize};

use super::{ImagePlacement, Point, Rect};
use crate::recognition::TextDetection;

/// Bookkeeping captured when a selection is handed to the extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionContext {
    /// Surface-space origin of the crop (selection after stroke inset)
    pub surface_origin: Point,
    /// Surface-space origin of the placed image at capture time
    pub image_origin: Point,
    /// Display scale of the placement at capture time
    pub display_scale: f64,
    /// Height in pixels of the crop that was submitted
    pub requested_height: f64,
    /// Height of the sample the service actually recognised, when known
    pub recognized_height: Option<f64>,
    /// Generation of the placement this region was cut from
    pub generation: u64,
}

impl RegionContext {
    /// Capture the context for a crop of `crop_bounds` cut from `placement`
    pub fn capture(crop_bounds: Rect, crop_height_px: u32, placement: &ImagePlacement, generation: u64) -> Self {
        Self {
            surface_origin: crop_bounds.origin(),
            image_origin: placement.origin(),
            display_scale: placement.scale(),
            requested_height: crop_height_px as f64,
            recognized_height: None,
            generation,
        }
    }

    /// Record the sample height reported by the service
    pub fn with_recognized_height(mut self, height: Option<f64>) -> Self {
        self.recognized_height = height;
        self
    }

    /// Factor from recognition space back to crop pixels
    pub fn recognition_scale(&self) -> f64 {
        match self.recognized_height {
            Some(h) if h > 0.0 && h.is_finite() && self.requested_height > 0.0 => self.requested_height / h,
            _ => 1.0,
        }
    }

    /// Factor from surface pixels to original-image pixels
    pub fn image_scale(&self) -> Option<f64> {
        if self.display_scale.is_finite() && self.display_scale > 0.0 {
            Some(1.0 / self.display_scale)
        } else {
            None
        }
    }

    /// Map a recognition-space point into original-image space
    pub fn to_image(&self, point: Point) -> Option<Point> {
        let image_scale = self.image_scale()?;
        let recognition_scale = self.recognition_scale();
        Some(Point::new(
            image_scale * (point.x * recognition_scale + self.surface_origin.x - self.image_origin.x),
            image_scale * (point.y * recognition_scale + self.surface_origin.y - self.image_origin.y),
        ))
    }
}

/// Normalize a recognition-space detection into original-image space.
///
/// A context with a degenerate display scale leaves the detection as is.
pub fn normalize_detection(detection: &TextDetection, context: &RegionContext) -> TextDetection {
    let min = context.to_image(Point::new(detection.min_x, detection.min_y));
    let max = context.to_image(Point::new(detection.max_x, detection.max_y));

    let (Some(a), Some(b)) = (min, max) else {
        return detection.clone();
    };

    TextDetection {
        min_x: a.x.min(b.x),
        min_y: a.y.min(b.y),
        max_x: a.x.max(b.x),
        max_y: a.y.max(b.y),
        ..detection.clone()
    }
}
