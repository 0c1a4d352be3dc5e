//! Image placement on the drawing surface
//!
//! An `ImagePlacement` records where the loaded image is rendered on the
//! surface and its true pixel size. The display scale derived from it is
//! the single source of truth for surface <-> image conversion.

use serde::{Deserialize, Serialize};

use super::{Point, Rect};

/// Where and how large the loaded image is rendered on the surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlacement {
    /// Surface x of the image's left edge
    pub left: f64,
    /// Surface y of the image's top edge
    pub top: f64,
    /// Rendered width on the surface
    pub width: f64,
    /// Rendered height on the surface
    pub height: f64,
    /// Width of the original raster in pixels
    pub original_width: f64,
    /// Height of the original raster in pixels
    pub original_height: f64,
}

impl ImagePlacement {
    /// Fit an image of `original` size onto a surface of `surface` size.
    ///
    /// The image is scaled down uniformly to fit, never enlarged, and
    /// centred on the surface.
    pub fn fit(surface: (f64, f64), original: (f64, f64)) -> Self {
        let (surface_w, surface_h) = surface;
        let (image_w, image_h) = original;

        let scale = if image_w > 0.0 && image_h > 0.0 {
            (surface_w / image_w).min(surface_h / image_h).min(1.0)
        } else {
            0.0
        };

        let width = image_w * scale;
        let height = image_h * scale;

        Self {
            left: (surface_w - width) / 2.0,
            top: (surface_h - height) / 2.0,
            width,
            height,
            original_width: image_w,
            original_height: image_h,
        }
    }

    /// Display scale (surface pixels per image pixel)
    ///
    /// Zero when no usable image is placed.
    pub fn scale(&self) -> f64 {
        if self.original_height > 0.0 && self.height.is_finite() {
            self.height / self.original_height
        } else {
            0.0
        }
    }

    /// True when the placement cannot be used for conversions
    pub fn is_degenerate(&self) -> bool {
        let scale = self.scale();
        !(scale.is_finite() && scale > 0.0)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Surface-space bounds of the rendered image
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    /// Map an image-space point onto the surface.
    ///
    /// Degenerate placements leave the point unchanged.
    pub fn image_to_surface(&self, point: Point) -> Point {
        if self.is_degenerate() {
            return point;
        }
        let scale = self.scale();
        Point::new(point.x * scale + self.left, point.y * scale + self.top)
    }

    /// Map a surface point back into image space.
    ///
    /// Returns `None` for degenerate placements.
    pub fn surface_to_image(&self, point: Point) -> Option<Point> {
        if self.is_degenerate() {
            return None;
        }
        let scale = self.scale();
        Some(Point::new((point.x - self.left) / scale, (point.y - self.top) / scale))
    }

    /// Map an image-space rectangle onto the surface
    pub fn image_rect_to_surface(&self, rect: Rect) -> Rect {
        if self.is_degenerate() {
            return rect;
        }
        let scale = self.scale();
        let origin = self.image_to_surface(rect.origin());
        Rect::new(origin.x, origin.y, rect.width * scale, rect.height * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImagePlacement {
        ImagePlacement {
            left: 10.0,
            top: 20.0,
            width: 200.0,
            height: 100.0,
            original_width: 400.0,
            original_height: 200.0,
        }
    }

    #[test]
    fn test_scale() {
        assert!((sample().scale() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let placements = [
            sample(),
            ImagePlacement::fit((800.0, 600.0), (1920.0, 1080.0)),
            ImagePlacement::fit((800.0, 600.0), (300.0, 900.0)),
            ImagePlacement::fit((1024.0, 768.0), (640.0, 480.0)),
        ];
        let points = [
            Point::new(0.0, 0.0),
            Point::new(13.5, 77.25),
            Point::new(-40.0, 1000.0),
            Point::new(399.0, 199.0),
        ];

        for placement in &placements {
            for &p in &points {
                let back = placement
                    .surface_to_image(placement.image_to_surface(p))
                    .unwrap();
                assert!((back.x - p.x).abs() < 1e-6, "{:?} -> {:?}", p, back);
                assert!((back.y - p.y).abs() < 1e-6, "{:?} -> {:?}", p, back);
            }
        }
    }

    #[test]
    fn test_degenerate_placement_is_noop() {
        let placement = ImagePlacement {
            left: 5.0,
            top: 5.0,
            width: 0.0,
            height: 0.0,
            original_width: 0.0,
            original_height: 0.0,
        };
        assert!(placement.is_degenerate());

        let p = Point::new(3.0, 4.0);
        assert_eq!(placement.image_to_surface(p), p);
        assert_eq!(placement.surface_to_image(p), None);
    }

    #[test]
    fn test_fit_never_enlarges() {
        let placement = ImagePlacement::fit((1000.0, 1000.0), (200.0, 100.0));
        assert_eq!(placement.scale(), 1.0);
        assert_eq!(placement.left, 400.0);
        assert_eq!(placement.top, 450.0);
    }

    #[test]
    fn test_fit_scales_down_and_centres() {
        let placement = ImagePlacement::fit((800.0, 600.0), (1600.0, 600.0));
        assert!((placement.scale() - 0.5).abs() < 1e-9);
        assert_eq!(placement.width, 800.0);
        assert_eq!(placement.height, 300.0);
        assert_eq!(placement.left, 0.0);
        assert_eq!(placement.top, 150.0);
        // uniform scale
        assert!((placement.width / placement.original_width - placement.scale()).abs() < 1e-9);
    }

    #[test]
    fn test_image_rect_to_surface() {
        let rect = sample().image_rect_to_surface(Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(rect, Rect::new(10.0, 20.0, 50.0, 25.0));
    }
}
