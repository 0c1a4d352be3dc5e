//! Region Extractor
//!
//! Re-renders only the image layer of the surface into an off-screen
//! target the size of a selection, so the crop sent for recognition never
//! contains overlays, pencil marks or the selection box itself.

pub mod codec;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use thiserror::Error;
use tracing::{debug, trace};

use crate::geometry::{Point, Rect};
use crate::surface::{ImageObject, ObjectType, SelectionRect, Surface};

/// Extraction and raster codec failures
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("crop of {width}x{height} exceeds the {max}px limit")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("not a base64 image data URL")]
    InvalidDataUrl,
}

/// Raster cut from the surface for one selection
#[derive(Debug, Clone)]
pub struct RegionCrop {
    /// Image-layer pixels under the selection
    pub image: RgbaImage,
    /// Surface-space bounds the raster covers (stroke removed)
    pub bounds: Rect,
}

/// Off-screen render target scoped to a single extraction
struct OffscreenTarget {
    buffer: RgbaImage,
}

impl OffscreenTarget {
    fn acquire(width: u32, height: u32) -> Self {
        trace!("Acquired {}x{} off-screen target", width, height);
        Self {
            buffer: RgbaImage::new(width, height),
        }
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.buffer.width() as f64, self.buffer.height() as f64)
    }

    /// Draw the visible part of an image object placed in target-local units.
    /// Returns false when the object lies entirely outside the target.
    fn draw_image(&mut self, object: &ImageObject) -> bool {
        if object.scale <= 0.0 || !object.scale.is_finite() {
            return false;
        }
        let Some(visible) = object.bounds().intersection(&self.bounds()) else {
            return false;
        };

        // Destination pixels first; the source window is derived from them
        let dest_x0 = visible.left.round();
        let dest_y0 = visible.top.round();
        let dest_x1 = visible.right().round();
        let dest_y1 = visible.bottom().round();
        if dest_x1 <= dest_x0 || dest_y1 <= dest_y0 {
            return false;
        }

        let raster = object.raster.as_ref();
        let src_x0 = (((dest_x0 - object.left) / object.scale).floor().max(0.0) as u32).min(raster.width());
        let src_y0 = (((dest_y0 - object.top) / object.scale).floor().max(0.0) as u32).min(raster.height());
        let src_x1 = (((dest_x1 - object.left) / object.scale).ceil().max(0.0) as u32).min(raster.width());
        let src_y1 = (((dest_y1 - object.top) / object.scale).ceil().max(0.0) as u32).min(raster.height());
        if src_x1 <= src_x0 || src_y1 <= src_y0 {
            return false;
        }

        let dest_x = dest_x0 as i64;
        let dest_y = dest_y0 as i64;
        let dest_w = (dest_x1 - dest_x0) as u32;
        let dest_h = (dest_y1 - dest_y0) as u32;

        let source = imageops::crop_imm(raster, src_x0, src_y0, src_x1 - src_x0, src_y1 - src_y0).to_image();
        let scaled = if source.dimensions() == (dest_w, dest_h) {
            source
        } else {
            imageops::resize(&source, dest_w, dest_h, FilterType::Triangle)
        };

        imageops::overlay(&mut self.buffer, &scaled, dest_x, dest_y);
        true
    }

    fn into_raster(mut self) -> RgbaImage {
        std::mem::replace(&mut self.buffer, RgbaImage::new(0, 0))
    }
}

impl Drop for OffscreenTarget {
    fn drop(&mut self) {
        trace!("Disposed off-screen target");
    }
}

/// Cut the image layer under `selection` out of the surface.
///
/// The inner bounds are snapped to whole surface pixels, and the returned
/// `bounds` are exactly the pixels the raster covers.
///
/// Returns `Ok(None)` when the selection is empty once its stroke is removed
/// or when no image object intersects it. The live surface is not touched:
/// image objects are cloned and shifted into crop-local coordinates.
pub fn extract_region(
    surface: &Surface,
    selection: &SelectionRect,
    max_dimension: u32,
) -> Result<Option<RegionCrop>, ExtractError> {
    let bounds = snap_to_pixels(selection.inner_bounds());
    let width = bounds.width as u32;
    let height = bounds.height as u32;

    if width == 0 || height == 0 {
        debug!("Selection is empty after removing its stroke");
        return Ok(None);
    }
    if width > max_dimension || height > max_dimension {
        return Err(ExtractError::TooLarge {
            width,
            height,
            max: max_dimension,
        });
    }

    let mut target = OffscreenTarget::acquire(width, height);
    let mut drawn = 0usize;

    for object in surface.objects_of(ObjectType::Image) {
        let Some(image) = object.as_image() else {
            continue;
        };
        let mut local = image.clone();
        local.left -= bounds.left;
        local.top -= bounds.top;

        if target.draw_image(&local) {
            drawn += 1;
        }
    }

    if drawn == 0 {
        debug!("No image content under selection at ({:.1}, {:.1})", bounds.left, bounds.top);
        return Ok(None);
    }

    Ok(Some(RegionCrop {
        image: target.into_raster(),
        bounds,
    }))
}

fn snap_to_pixels(rect: Rect) -> Rect {
    let left = rect.left.round();
    let top = rect.top.round();
    let right = rect.right().round().max(left);
    let bottom = rect.bottom().round().max(top);
    Rect::from_corners(Point::new(left, top), Point::new(right, bottom))
}
