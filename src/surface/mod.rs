//! Drawing Surface
//!
//! In-memory model of the annotation canvas: an ordered list of drawable
//! objects, the viewport, and the active (selected) object. Rendering is
//! left to the host; the surface only reports object types and bounds.

pub mod object;
pub mod scan;

pub use object::{
    FreehandPath, ImageObject, ObjectId, ObjectKind, ObjectType, OverlayShape, OverlayStroke, SelectionRect,
    SurfaceObject,
};

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::geometry::{ImagePlacement, Point, Viewport};

/// The drawing surface
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    objects: Vec<SurfaceObject>,
    next_id: ObjectId,
    active: Option<ObjectId>,
    /// Zoom/pan applied to pointer input
    pub viewport: Viewport,
}

impl Surface {
    /// Create an empty surface
    pub fn new(width: u32, height: u32, viewport: Viewport) -> Self {
        Self {
            width,
            height,
            objects: Vec::new(),
            next_id: 1,
            active: None,
            viewport,
        }
    }

    /// Add an object on top of the stack
    pub fn add_object(&mut self, kind: ObjectKind, locked: bool, selectable: bool) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.push(SurfaceObject {
            id,
            locked,
            selectable,
            kind,
        });
        id
    }

    /// Remove an object, returning it if it was present
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SurfaceObject> {
        let pos = self.objects.iter().position(|o| o.id == id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.objects.remove(pos))
    }

    pub fn get(&self, id: ObjectId) -> Option<&SurfaceObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SurfaceObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// All objects, bottom to top
    pub fn objects(&self) -> &[SurfaceObject] {
        &self.objects
    }

    /// Objects carrying the given type tag
    pub fn objects_of(&self, object_type: ObjectType) -> impl Iterator<Item = &SurfaceObject> {
        self.objects.iter().filter(move |o| o.object_type() == object_type)
    }

    /// Ids of every object under a surface point, bottom to top
    pub fn hit_test(&self, point: Point) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.contains_point(point))
            .map(|o| o.id)
            .collect()
    }

    /// Topmost selectable object under a point
    pub fn pick(&self, point: Point) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.selectable && o.contains_point(point))
            .map(|o| o.id)
    }

    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    pub fn set_active(&mut self, id: Option<ObjectId>) {
        self.active = id.filter(|id| self.get(*id).is_some());
    }

    /// Remove every object
    pub fn clear(&mut self) {
        self.objects.clear();
        self.active = None;
    }

    /// Replace the document with a freshly loaded image.
    ///
    /// The image is fitted to the surface (never enlarged), centred, and
    /// added as a locked, non-selectable object.
    pub fn load_image(&mut self, raster: RgbaImage) -> ImagePlacement {
        self.clear();

        let placement = ImagePlacement::fit(
            (self.width as f64, self.height as f64),
            (raster.width() as f64, raster.height() as f64),
        );
        debug!(
            "Placing {}x{} image at ({:.1}, {:.1}) scale {:.4}",
            raster.width(),
            raster.height(),
            placement.left,
            placement.top,
            placement.scale()
        );

        self.add_object(
            ObjectKind::Image(ImageObject {
                left: placement.left,
                top: placement.top,
                scale: placement.scale(),
                raster: Arc::new(raster),
            }),
            true,
            false,
        );

        placement
    }

    /// Replace all objects with a restored set.
    ///
    /// Restored objects get fresh ids so none of them can alias an id handed
    /// out before the restore.
    pub fn restore(&mut self, objects: Vec<SurfaceObject>) {
        self.objects.clear();
        self.active = None;
        for object in objects {
            self.add_object(object.kind, object.locked, object.selectable);
        }
    }
}
