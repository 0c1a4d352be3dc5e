//! Annotation Coordinator
//!
//! Owns the drawing surface, the loaded image, the accumulated results and
//! the recognition session, and routes every input event through a single
//! dispatcher keyed on the active tool.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as PixelRect;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::geometry::{ImagePlacement, Point, Rect, Viewport};
use crate::input::{DrawingTool, Gesture, InputEvent, Key};
use crate::overlay::rebuild_overlays;
use crate::recognition::{RecognitionError, RecognitionMode, RecognitionResult, RecognitionService};
use crate::results::ResultStore;
use crate::session::{
    LoadedImage, MergeOutcome, RecognitionJob, RecognitionSession, SessionError, SessionPhase, SessionSettings,
};
use crate::storage::DocumentSnapshot;
use crate::surface::{FreehandPath, ObjectId, ObjectKind, ObjectType, OverlayStroke, Surface};

const OVERLAY_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Result of dispatching one input event
#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    /// Nothing visible changed
    Ignored,
    /// Surface or viewport changed
    Redraw,
    /// A region is ready for the recognition service
    Recognize(RecognitionJob),
    /// Overlay labels picked by the sort tool, in touch order
    ReadOrder(Vec<usize>),
}

/// Interactive annotation document
pub struct Annotator {
    config: AppConfig,
    surface: Surface,
    loaded: Option<LoadedImage>,
    generation: u64,
    results: ResultStore,
    session: RecognitionSession,
    tool: DrawingTool,
    gesture: Gesture,
}

impl Annotator {
    /// Create an empty annotator
    pub fn new(config: AppConfig) -> Self {
        let viewport = Viewport::new(config.surface.zoom_min, config.surface.zoom_max);
        let surface = Surface::new(config.surface.width, config.surface.height, viewport);

        let mode = if config.recognition.translate {
            RecognitionMode::Translate {
                target_language: config.recognition.target_language.clone(),
            }
        } else {
            RecognitionMode::Recognize
        };
        let session = RecognitionSession::new(SessionSettings {
            stroke_width: config.selection.stroke_width,
            max_crop_dimension: config.recognition.max_crop_dimension,
            detection_size: config.recognition.detection_size,
            mode,
        });

        Self {
            config,
            surface,
            loaded: None,
            generation: 0,
            results: ResultStore::new(),
            session,
            tool: DrawingTool::None,
            gesture: Gesture::Idle,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn loaded(&self) -> Option<&LoadedImage> {
        self.loaded.as_ref()
    }

    pub fn tool(&self) -> DrawingTool {
        self.tool
    }

    pub fn session_phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// Switch between plain recognition and translation
    pub fn set_recognition_mode(&mut self, mode: RecognitionMode) {
        self.session.set_mode(mode);
    }

    /// Replace the document with a new image.
    ///
    /// A recognition still in flight for the previous image will be
    /// discarded when it completes.
    pub fn load_image(&mut self, raster: RgbaImage) -> ImagePlacement {
        self.session.cancel_selection(&mut self.surface);
        self.gesture = Gesture::Idle;

        let placement = self.surface.load_image(raster);
        self.generation += 1;
        self.loaded = Some(LoadedImage {
            placement,
            generation: self.generation,
        });
        self.results.clear();

        info!(
            "Loaded {}x{} image (generation {})",
            placement.original_width, placement.original_height, self.generation
        );
        placement
    }

    /// Change the active tool, abandoning any gesture in progress
    pub fn set_tool(&mut self, tool: DrawingTool) {
        self.abort_gesture();
        if self.tool != tool {
            debug!("Tool {} -> {}", self.tool, tool);
        }
        if tool != DrawingTool::Select {
            self.surface.set_active(None);
        }
        self.tool = tool;
    }

    fn abort_gesture(&mut self) {
        if let Gesture::Sorting { touched } = &self.gesture {
            let touched = touched.clone();
            self.set_overlay_stroke(&touched, OverlayStroke::Normal);
        }
        if self.gesture == Gesture::Region {
            self.session.cancel_selection(&mut self.surface);
        }
        self.gesture = Gesture::Idle;
    }

    /// Dispatch one input event
    pub fn handle_input(&mut self, event: InputEvent) -> Result<InputOutcome, SessionError> {
        match event {
            InputEvent::KeyDown { key: Key::Alt } => {
                self.set_tool(DrawingTool::Select);
                Ok(InputOutcome::Redraw)
            }
            InputEvent::KeyDown { key: Key::Char(c) } => match DrawingTool::from_shortcut(c) {
                Some(tool) => {
                    self.set_tool(tool);
                    Ok(InputOutcome::Redraw)
                }
                None => Ok(InputOutcome::Ignored),
            },
            InputEvent::Wheel { at, delta_y } => {
                if !self.config.surface.enable_zoom {
                    return Ok(InputOutcome::Ignored);
                }
                self.surface.viewport.wheel(at, delta_y);
                Ok(InputOutcome::Redraw)
            }
            InputEvent::PointerDown { at, alt } => self.pointer_down(at, alt),
            InputEvent::PointerMove { at } => self.pointer_move(at),
            InputEvent::PointerUp { at } => self.pointer_up(at),
        }
    }

    fn pointer_down(&mut self, screen: Point, alt: bool) -> Result<InputOutcome, SessionError> {
        if alt {
            if !self.config.surface.enable_pan {
                return Ok(InputOutcome::Ignored);
            }
            self.abort_gesture();
            self.gesture = Gesture::Panning { last: screen };
            return Ok(InputOutcome::Ignored);
        }

        let at = self.surface.viewport.screen_to_surface(screen);
        match self.tool {
            DrawingTool::Select | DrawingTool::None => {
                let picked = self.surface.pick(at);
                self.surface.set_active(picked);
                Ok(InputOutcome::Redraw)
            }
            DrawingTool::Pencil => {
                self.gesture = Gesture::Drawing { points: vec![at] };
                Ok(InputOutcome::Ignored)
            }
            DrawingTool::Eraser => {
                self.gesture = Gesture::Erasing { touched: Vec::new() };
                self.touch_at(at);
                Ok(InputOutcome::Ignored)
            }
            DrawingTool::Sort => {
                self.gesture = Gesture::Sorting { touched: Vec::new() };
                self.touch_at(at);
                Ok(InputOutcome::Redraw)
            }
            DrawingTool::Ocr => {
                if self.surface.active().is_some() {
                    return Ok(InputOutcome::Ignored);
                }
                self.session.begin_selection(&mut self.surface, at)?;
                self.gesture = Gesture::Region;
                Ok(InputOutcome::Redraw)
            }
        }
    }

    fn pointer_move(&mut self, screen: Point) -> Result<InputOutcome, SessionError> {
        if let Gesture::Panning { last } = &mut self.gesture {
            let (dx, dy) = (screen.x - last.x, screen.y - last.y);
            *last = screen;
            self.surface.viewport.pan_by(dx, dy);
            return Ok(InputOutcome::Redraw);
        }

        let at = self.surface.viewport.screen_to_surface(screen);
        if let Gesture::Drawing { points } = &mut self.gesture {
            points.push(at);
            return Ok(InputOutcome::Redraw);
        }

        match self.gesture {
            Gesture::Idle | Gesture::Panning { .. } | Gesture::Drawing { .. } => Ok(InputOutcome::Ignored),
            Gesture::Erasing { .. } | Gesture::Sorting { .. } => {
                self.touch_at(at);
                Ok(InputOutcome::Redraw)
            }
            Gesture::Region => {
                self.session.update_selection(&mut self.surface, at)?;
                Ok(InputOutcome::Redraw)
            }
        }
    }

    fn pointer_up(&mut self, screen: Point) -> Result<InputOutcome, SessionError> {
        let at = self.surface.viewport.screen_to_surface(screen);

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning { .. } => Ok(InputOutcome::Ignored),
            Gesture::Drawing { mut points } => {
                points.push(at);
                let drawn = Rect::bounding(&points).is_some_and(|r| r.width > 0.0 || r.height > 0.0);
                if !drawn {
                    debug!("Discarding zero-size pencil stroke");
                    return Ok(InputOutcome::Ignored);
                }
                self.surface.add_object(
                    ObjectKind::Path(FreehandPath {
                        points,
                        color: self.config.pencil.color.clone(),
                        width: self.config.pencil.width,
                    }),
                    false,
                    true,
                );
                Ok(InputOutcome::Redraw)
            }
            Gesture::Erasing { touched } => {
                for id in &touched {
                    self.surface.remove_object(*id);
                }
                debug!("Erased {} objects", touched.len());
                Ok(InputOutcome::Redraw)
            }
            Gesture::Sorting { touched } => {
                self.set_overlay_stroke(&touched, OverlayStroke::Normal);
                let labels: Vec<usize> = touched
                    .iter()
                    .filter_map(|id| self.surface.get(*id).and_then(|o| o.as_overlay()).map(|o| o.label))
                    .collect();
                if labels.is_empty() {
                    Ok(InputOutcome::Redraw)
                } else {
                    Ok(InputOutcome::ReadOrder(labels))
                }
            }
            Gesture::Region => {
                self.session.update_selection(&mut self.surface, at)?;
                match self.session.finish_selection(&mut self.surface, self.loaded.as_ref())? {
                    Some(job) => Ok(InputOutcome::Recognize(job)),
                    None => Ok(InputOutcome::Redraw),
                }
            }
        }
    }

    /// Record objects under `at` for the eraser or sort drag in progress
    fn touch_at(&mut self, at: Point) {
        let sorting = matches!(self.gesture, Gesture::Sorting { .. });
        let candidates: Vec<ObjectId> = self
            .surface
            .hit_test(at)
            .into_iter()
            .filter(|id| {
                self.surface.get(*id).is_some_and(|o| {
                    if o.locked {
                        return false;
                    }
                    match o.as_overlay() {
                        Some(overlay) => sorting || overlay.erasable,
                        None => !sorting,
                    }
                })
            })
            .collect();

        for id in candidates {
            self.gesture.touch(id);
            if sorting {
                self.set_overlay_stroke(&[id], OverlayStroke::Highlighted);
            }
        }
    }

    fn set_overlay_stroke(&mut self, ids: &[ObjectId], stroke: OverlayStroke) {
        for id in ids {
            if let Some(ObjectKind::Overlay(overlay)) = self.surface.get_mut(*id).map(|o| &mut o.kind) {
                overlay.stroke = stroke;
            }
        }
    }

    /// Merge the outcome of a recognition job
    pub fn complete_recognition(
        &mut self,
        ticket: u64,
        outcome: Result<RecognitionResult, RecognitionError>,
    ) -> Result<MergeOutcome, SessionError> {
        self.session
            .complete(&mut self.surface, &mut self.results, self.loaded.as_ref(), ticket, outcome)
    }

    /// Send a job to the service and merge its outcome
    pub async fn recognize_with(
        &mut self,
        service: &dyn RecognitionService,
        job: RecognitionJob,
    ) -> Result<MergeOutcome, SessionError> {
        self.session
            .run(service, job, &mut self.surface, &mut self.results, self.loaded.as_ref())
            .await
    }

    /// Apply a read order picked with the sort tool and relabel overlays
    pub fn reorder(&mut self, labels: &[usize]) {
        self.results.reorder(labels);
        if let Some(loaded) = &self.loaded {
            rebuild_overlays(&mut self.surface, self.results.as_slice(), &loaded.placement);
        }
    }

    /// Original image with every detection outlined, at full resolution
    pub fn render_annotated(&self) -> Option<RgbaImage> {
        let image = self.surface.objects_of(ObjectType::Image).find_map(|o| o.as_image())?;
        let mut canvas = image.raster.as_ref().clone();

        for detection in self.results.iter() {
            let x = detection.min_x.round() as i32;
            let y = detection.min_y.round() as i32;
            let w = detection.width().round().max(1.0) as u32;
            let h = detection.height().round().max(1.0) as u32;

            draw_hollow_rect_mut(&mut canvas, PixelRect::at(x, y).of_size(w, h), OVERLAY_COLOR);
            if w > 2 && h > 2 {
                draw_hollow_rect_mut(&mut canvas, PixelRect::at(x + 1, y + 1).of_size(w - 2, h - 2), OVERLAY_COLOR);
            }
        }
        Some(canvas)
    }

    /// Capture the document for saving
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            placement: self.loaded.map(|l| l.placement),
            objects: self
                .surface
                .objects()
                .iter()
                .filter(|o| o.object_type() != ObjectType::Selection)
                .cloned()
                .collect(),
            results: self.results.clone(),
        }
    }

    /// Replace the document with a saved snapshot
    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.session.cancel_selection(&mut self.surface);
        self.gesture = Gesture::Idle;

        self.surface.restore(snapshot.objects);
        self.generation += 1;
        let generation = self.generation;
        self.loaded = snapshot.placement.map(|placement| LoadedImage { placement, generation });
        self.results = snapshot.results;

        info!(
            "Restored document: {} objects, {} detections",
            self.surface.objects().len(),
            self.results.len()
        );
    }
}
