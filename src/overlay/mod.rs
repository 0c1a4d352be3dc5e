//! Detection Overlay Builder
//!
//! Turns image-space detections into surface-space overlay boxes. Each
//! overlay carries a label equal to its index in the detection sequence so
//! the read-order tool can refer back to the result store.

use tracing::debug;

use crate::geometry::{ImagePlacement, Point, Rect};
use crate::recognition::TextDetection;
use crate::surface::{ObjectKind, ObjectType, OverlayShape, OverlayStroke, Surface};

/// Build one overlay per detection.
///
/// `origin_offset` is added to every surface position for detections
/// expressed relative to a sub-region; use `Point::ZERO` for whole-image
/// detections. Labels start at `start_label`.
pub fn build_overlays(
    detections: &[TextDetection],
    placement: &ImagePlacement,
    origin_offset: Point,
    start_label: usize,
) -> Vec<OverlayShape> {
    detections
        .iter()
        .enumerate()
        .map(|(i, detection)| {
            let image_rect = Rect::new(detection.min_x, detection.min_y, detection.width(), detection.height());
            let bounds = placement
                .image_rect_to_surface(image_rect)
                .translate(origin_offset.x, origin_offset.y);

            OverlayShape {
                bounds,
                label: start_label + i,
                text: detection.text.clone(),
                erasable: false,
                stroke: OverlayStroke::Normal,
            }
        })
        .collect()
}

/// Add overlays to the surface as non-selectable objects
pub fn place_overlays(surface: &mut Surface, overlays: Vec<OverlayShape>) {
    for overlay in overlays {
        surface.add_object(ObjectKind::Overlay(overlay), false, false);
    }
}

/// Replace every overlay on the surface with freshly built ones so labels
/// match indices again
pub fn rebuild_overlays(surface: &mut Surface, detections: &[TextDetection], placement: &ImagePlacement) {
    let stale: Vec<_> = surface.objects_of(ObjectType::Overlay).map(|o| o.id).collect();
    for id in &stale {
        surface.remove_object(*id);
    }

    let overlays = build_overlays(detections, placement, Point::ZERO, 0);
    debug!("Rebuilt overlays: removed {}, placed {}", stale.len(), overlays.len());
    place_overlays(surface, overlays);
}
