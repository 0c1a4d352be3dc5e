//! Drawable objects held by the surface
//!
//! Every object is one explicit variant carrying exactly the fields its
//! kind needs. The serialized form is a tagged schema (`"kind": "image"`,
//! ...), image rasters embedded as PNG data URLs.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Identifier of an object on the surface
pub type ObjectId = u64;

/// Type tag of a drawable object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Image,
    Selection,
    Overlay,
    Path,
}

/// A placed raster image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageObject {
    pub left: f64,
    pub top: f64,
    /// Uniform display scale
    pub scale: f64,
    #[serde(with = "crate::extract::codec::data_url")]
    pub raster: Arc<RgbaImage>,
}

impl ImageObject {
    pub fn width(&self) -> f64 {
        self.raster.width() as f64 * self.scale
    }

    pub fn height(&self) -> f64 {
        self.raster.height() as f64 * self.scale
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.width(), self.height())
    }
}

/// A user-drawn recognition region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Stroke width that inflates the drawn box
    pub stroke_inset: f64,
}

impl SelectionRect {
    /// Zero-size selection anchored at `start`
    pub fn anchored(start: Point, stroke_inset: f64) -> Self {
        Self {
            left: start.x,
            top: start.y,
            width: 0.0,
            height: 0.0,
            stroke_inset,
        }
    }

    /// Stretch the selection between its anchor and `current`
    pub fn stretch(&mut self, anchor: Point, current: Point) {
        let rect = Rect::from_corners(anchor, current);
        self.left = rect.left;
        self.top = rect.top;
        self.width = rect.width;
        self.height = rect.height;
    }

    /// Bounds as drawn, stroke included
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    /// Bounds with the stroke removed from all four edges
    pub fn inner_bounds(&self) -> Rect {
        self.bounds().inset(self.stroke_inset)
    }

    /// True when nothing was drawn
    pub fn has_zero_area(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Stroke state of an overlay badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStroke {
    #[default]
    Normal,
    /// Touched by the sort tool during the current drag
    Highlighted,
}

/// Surface-space box marking one recognised text span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayShape {
    pub bounds: Rect,
    /// Index of the detection in the accumulated results
    pub label: usize,
    pub text: String,
    /// Whether the eraser may remove this overlay
    pub erasable: bool,
    #[serde(default)]
    pub stroke: OverlayStroke,
}

/// Free-hand pencil stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandPath {
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
}

impl FreehandPath {
    pub fn bounds(&self) -> Rect {
        Rect::bounding(&self.points)
            .map(|r| r.inflate(self.width / 2.0))
            .unwrap_or_default()
    }
}

/// Variant payload of a drawable object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    Image(ImageObject),
    Selection(SelectionRect),
    Overlay(OverlayShape),
    Path(FreehandPath),
}

/// An object on the drawing surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceObject {
    pub id: ObjectId,
    /// Locked objects survive the eraser and the sort tool
    pub locked: bool,
    /// Whether the select tool can pick this object
    pub selectable: bool,
    #[serde(flatten)]
    pub kind: ObjectKind,
}

impl SurfaceObject {
    pub fn object_type(&self) -> ObjectType {
        match &self.kind {
            ObjectKind::Image(_) => ObjectType::Image,
            ObjectKind::Selection(_) => ObjectType::Selection,
            ObjectKind::Overlay(_) => ObjectType::Overlay,
            ObjectKind::Path(_) => ObjectType::Path,
        }
    }

    /// Axis-aligned bounding box in surface space
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            ObjectKind::Image(image) => image.bounds(),
            ObjectKind::Selection(selection) => selection.bounds(),
            ObjectKind::Overlay(overlay) => overlay.bounds,
            ObjectKind::Path(path) => path.bounds(),
        }
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }

    pub fn as_image(&self) -> Option<&ImageObject> {
        match &self.kind {
            ObjectKind::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&SelectionRect> {
        match &self.kind {
            ObjectKind::Selection(selection) => Some(selection),
            _ => None,
        }
    }

    pub fn as_overlay(&self) -> Option<&OverlayShape> {
        match &self.kind {
            ObjectKind::Overlay(overlay) => Some(overlay),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_inner_bounds() {
        let selection = SelectionRect {
            left: 10.0,
            top: 10.0,
            width: 50.0,
            height: 30.0,
            stroke_inset: 2.0,
        };
        assert_eq!(selection.inner_bounds(), Rect::new(12.0, 12.0, 46.0, 26.0));
    }

    #[test]
    fn test_selection_stretch_any_direction() {
        let anchor = Point::new(100.0, 100.0);
        let mut selection = SelectionRect::anchored(anchor, 2.0);
        assert!(selection.has_zero_area());

        selection.stretch(anchor, Point::new(40.0, 160.0));
        assert_eq!(selection.bounds(), Rect::new(40.0, 100.0, 60.0, 60.0));
        assert!(!selection.has_zero_area());
    }

    #[test]
    fn test_tagged_schema() {
        let object = SurfaceObject {
            id: 7,
            locked: false,
            selectable: false,
            kind: ObjectKind::Overlay(OverlayShape {
                bounds: Rect::new(1.0, 2.0, 3.0, 4.0),
                label: 0,
                text: "你好".to_string(),
                erasable: false,
                stroke: OverlayStroke::Normal,
            }),
        };

        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["kind"], "overlay");
        assert_eq!(json["id"], 7);
        assert_eq!(json["label"], 0);

        let parsed: SurfaceObject = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.object_type(), ObjectType::Overlay);
        assert_eq!(parsed.as_overlay().map(|o| o.text.as_str()), Some("你好"));
    }

    #[test]
    fn test_path_bounds_include_brush_width() {
        let path = FreehandPath {
            points: vec![Point::new(10.0, 10.0), Point::new(20.0, 30.0)],
            color: "#ff0000".to_string(),
            width: 4.0,
        };
        assert_eq!(path.bounds(), Rect::new(8.0, 8.0, 14.0, 24.0));
    }
}
