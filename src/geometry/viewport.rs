//! Viewport zoom and pan
//!
//! Pointer positions arrive in screen space and must be mapped through the
//! viewport before any surface-space logic sees them.

use serde::{Deserialize, Serialize};

use super::Point;

/// Zoom/pan state of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current zoom factor
    pub zoom: f64,
    /// Horizontal translation in screen pixels
    pub pan_x: f64,
    /// Vertical translation in screen pixels
    pub pan_y: f64,
    /// Lower zoom bound
    pub zoom_min: f64,
    /// Upper zoom bound
    pub zoom_max: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1.0, 20.0)
    }
}

impl Viewport {
    pub fn new(zoom_min: f64, zoom_max: f64) -> Self {
        Self {
            zoom: 1.0_f64.clamp(zoom_min, zoom_max),
            pan_x: 0.0,
            pan_y: 0.0,
            zoom_min,
            zoom_max,
        }
    }

    /// Map a screen position onto the surface
    pub fn screen_to_surface(&self, screen: Point) -> Point {
        Point::new((screen.x - self.pan_x) / self.zoom, (screen.y - self.pan_y) / self.zoom)
    }

    /// Map a surface position onto the screen
    pub fn surface_to_screen(&self, surface: Point) -> Point {
        Point::new(surface.x * self.zoom + self.pan_x, surface.y * self.zoom + self.pan_y)
    }

    /// Zoom to `zoom` keeping the surface point under `anchor` fixed on screen
    pub fn zoom_to_point(&mut self, anchor: Point, zoom: f64) {
        let zoom = zoom.clamp(self.zoom_min, self.zoom_max);
        let surface = self.screen_to_surface(anchor);
        self.zoom = zoom;
        self.pan_x = anchor.x - surface.x * zoom;
        self.pan_y = anchor.y - surface.y * zoom;
    }

    /// Apply a mouse wheel step (wheel up is negative, one notch is about 100)
    pub fn wheel(&mut self, anchor: Point, delta_y: f64) {
        let zoom = self.zoom * 0.999_f64.powf(delta_y);
        self.zoom_to_point(anchor, zoom);
    }

    /// Translate the view by a screen-space delta
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }
}
