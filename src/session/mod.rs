//! Recognition Session Controller
//!
//! Drives one recognition region through
//! `Idle -> Selecting -> Extracting -> Recognizing -> Merging -> Idle`, or
//! `Recognizing -> Failed -> Idle` when the service call fails. Only one
//! region is in flight at a time.
//!
//! The service call is the only suspension point, so the controller is split
//! around it: `finish_selection` hands out a [`RecognitionJob`], the caller
//! awaits the service, and `complete` merges (or discards) the outcome.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DetectionSizeMode;
use crate::extract::{codec, extract_region};
use crate::geometry::{normalize_detection, ImagePlacement, Point, RegionContext};
use crate::overlay::{build_overlays, place_overlays};
use crate::recognition::{
    RecognitionError, RecognitionMode, RecognitionRequest, RecognitionResult, RecognitionService,
};
use crate::results::ResultStore;
use crate::surface::{ObjectId, ObjectKind, SelectionRect, Surface};

/// Session failures surfaced to the caller
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a recognition region is already in flight")]
    Busy,
    #[error("no selection is being drawn")]
    NoSelection,
    #[error("no in-flight recognition with ticket {0}")]
    UnknownTicket(u64),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

/// The image currently on the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedImage {
    pub placement: ImagePlacement,
    /// Bumped every time a new image replaces the document
    pub generation: u64,
}

/// Observable phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Selecting,
    Extracting,
    Recognizing,
    Merging,
    Failed,
}

#[derive(Debug, Clone)]
enum SessionState {
    Idle,
    Selecting {
        selection: ObjectId,
        anchor: Point,
    },
    Recognizing {
        ticket: u64,
        selection: ObjectId,
        context: RegionContext,
    },
}

/// A cropped region waiting for the recognition service
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionJob {
    pub ticket: u64,
    pub request: RecognitionRequest,
}

/// What happened to a completed recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Detections appended with labels `first_label..first_label + count`
    Merged { first_label: usize, count: usize },
    /// The image was replaced while the call was in flight
    Discarded,
}

/// Session settings taken from the configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub stroke_width: f64,
    pub max_crop_dimension: u32,
    pub detection_size: DetectionSizeMode,
    pub mode: RecognitionMode,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            stroke_width: 2.0,
            max_crop_dimension: 8192,
            detection_size: DetectionSizeMode::Ignore,
            mode: RecognitionMode::Recognize,
        }
    }
}

/// Serialised recognition session
#[derive(Debug)]
pub struct RecognitionSession {
    state: SessionState,
    next_ticket: u64,
    settings: SessionSettings,
}

impl RecognitionSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            state: SessionState::Idle,
            next_ticket: 1,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Switch between recognition and translation for later regions
    pub fn set_mode(&mut self, mode: RecognitionMode) {
        self.settings.mode = mode;
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Selecting { .. } => SessionPhase::Selecting,
            SessionState::Recognizing { .. } => SessionPhase::Recognizing,
        }
    }

    /// True while a region is waiting on the service
    pub fn is_busy(&self) -> bool {
        matches!(self.state, SessionState::Recognizing { .. })
    }

    fn transition(&self, to: SessionPhase) {
        debug!("Session {:?} -> {:?}", self.phase(), to);
    }

    /// Start drawing a recognition region at a surface point
    pub fn begin_selection(&mut self, surface: &mut Surface, at: Point) -> Result<ObjectId, SessionError> {
        match self.state {
            SessionState::Recognizing { .. } => return Err(SessionError::Busy),
            SessionState::Selecting { selection, .. } => {
                surface.remove_object(selection);
            }
            SessionState::Idle => {}
        }

        self.transition(SessionPhase::Selecting);
        let selection = surface.add_object(
            ObjectKind::Selection(SelectionRect::anchored(at, self.settings.stroke_width)),
            true,
            false,
        );
        self.state = SessionState::Selecting { selection, anchor: at };
        Ok(selection)
    }

    /// Stretch the region being drawn towards `to`
    pub fn update_selection(&mut self, surface: &mut Surface, to: Point) -> Result<(), SessionError> {
        let SessionState::Selecting { selection, anchor } = self.state else {
            return Err(SessionError::NoSelection);
        };
        if let Some(ObjectKind::Selection(rect)) = surface.get_mut(selection).map(|o| &mut o.kind) {
            rect.stretch(anchor, to);
        }
        Ok(())
    }

    /// Drop the region being drawn without recognising it
    pub fn cancel_selection(&mut self, surface: &mut Surface) {
        if let SessionState::Selecting { selection, .. } = self.state {
            surface.remove_object(selection);
            self.transition(SessionPhase::Idle);
            self.state = SessionState::Idle;
        }
    }

    /// Release the pointer: validate, extract and prepare the service call.
    ///
    /// Returns `Ok(None)` when there is nothing to recognise (empty region,
    /// no image loaded, no image content under the region); the region is
    /// removed and the session is idle again.
    pub fn finish_selection(
        &mut self,
        surface: &mut Surface,
        loaded: Option<&LoadedImage>,
    ) -> Result<Option<RecognitionJob>, SessionError> {
        let SessionState::Selecting { selection, .. } = self.state else {
            return Err(SessionError::NoSelection);
        };

        let rect = surface.get(selection).and_then(|o| o.as_selection()).copied();
        let Some(rect) = rect.filter(|r| !r.has_zero_area()) else {
            debug!("Discarding empty selection");
            self.abort(surface, selection);
            return Ok(None);
        };

        let Some(loaded) = loaded.filter(|l| !l.placement.is_degenerate()) else {
            warn!("No image placed, nothing to recognise");
            self.abort(surface, selection);
            return Ok(None);
        };

        self.transition(SessionPhase::Extracting);
        let crop = match extract_region(surface, &rect, self.settings.max_crop_dimension) {
            Ok(Some(crop)) => crop,
            Ok(None) => {
                debug!("Selection covers no image content");
                self.abort(surface, selection);
                return Ok(None);
            }
            Err(e) => {
                warn!("Region extraction failed: {}", e);
                self.abort(surface, selection);
                return Ok(None);
            }
        };

        let image_png = match codec::encode_png(&crop.image) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not encode crop: {}", e);
                self.abort(surface, selection);
                return Ok(None);
            }
        };

        let context = RegionContext::capture(crop.bounds, crop.image.height(), &loaded.placement, loaded.generation);
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        self.transition(SessionPhase::Recognizing);
        debug!(
            "Ticket {}: {}x{} crop at ({:.1}, {:.1})",
            ticket,
            crop.image.width(),
            crop.image.height(),
            crop.bounds.left,
            crop.bounds.top
        );
        self.state = SessionState::Recognizing {
            ticket,
            selection,
            context,
        };

        Ok(Some(RecognitionJob {
            ticket,
            request: RecognitionRequest {
                image_png,
                mode: self.settings.mode.clone(),
            },
        }))
    }

    /// Merge the outcome of the service call for `ticket`.
    ///
    /// The region is removed from the surface on every path. Detections are
    /// only merged when `current` is still the image the region was cut
    /// from.
    pub fn complete(
        &mut self,
        surface: &mut Surface,
        results: &mut ResultStore,
        current: Option<&LoadedImage>,
        ticket: u64,
        outcome: Result<RecognitionResult, RecognitionError>,
    ) -> Result<MergeOutcome, SessionError> {
        let (selection, context) = match self.state {
            SessionState::Recognizing {
                ticket: pending,
                selection,
                context,
            } if pending == ticket => (selection, context),
            _ => return Err(SessionError::UnknownTicket(ticket)),
        };

        // The selection id belongs to the document that was replaced
        let current = match current {
            Some(loaded) if loaded.generation == context.generation => loaded,
            _ => {
                warn!("Ticket {}: image replaced while recognising, discarding result", ticket);
                self.state = SessionState::Idle;
                return Ok(MergeOutcome::Discarded);
            }
        };

        surface.remove_object(selection);

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.transition(SessionPhase::Failed);
                warn!("Ticket {}: recognition failed: {}", ticket, e);
                self.state = SessionState::Idle;
                return Err(SessionError::Recognition(e));
            }
        };

        self.transition(SessionPhase::Merging);
        let context = context.with_recognized_height(self.settings.detection_size.recognized_height(result.detection_size));
        let normalized: Vec<_> = result
            .detections
            .iter()
            .map(|d| normalize_detection(d, &context))
            .collect();
        let count = normalized.len();
        let first_label = results.append(normalized);

        let overlays = build_overlays(&results.as_slice()[first_label..], &current.placement, Point::ZERO, first_label);
        place_overlays(surface, overlays);

        info!("Ticket {}: merged {} detections ({} total)", ticket, count, results.len());
        self.transition(SessionPhase::Idle);
        self.state = SessionState::Idle;
        Ok(MergeOutcome::Merged { first_label, count })
    }

    /// Run one prepared job against a service and merge its outcome
    pub async fn run(
        &mut self,
        service: &dyn RecognitionService,
        job: RecognitionJob,
        surface: &mut Surface,
        results: &mut ResultStore,
        current: Option<&LoadedImage>,
    ) -> Result<MergeOutcome, SessionError> {
        let outcome = service.recognize(job.request).await;
        self.complete(surface, results, current, job.ticket, outcome)
    }

    fn abort(&mut self, surface: &mut Surface, selection: ObjectId) {
        surface.remove_object(selection);
        self.transition(SessionPhase::Idle);
        self.state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Viewport};
    use crate::recognition::TextDetection;
    use crate::surface::{ObjectType, OverlayShape, OverlayStroke};
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};

    struct FixedService(Result<RecognitionResult, u16>);

    #[async_trait]
    impl RecognitionService for FixedService {
        async fn recognize(&self, request: RecognitionRequest) -> Result<RecognitionResult, RecognitionError> {
            assert_eq!(&request.image_png[1..4], b"PNG");
            match &self.0 {
                Ok(result) => Ok(result.clone()),
                Err(code) => Err(RecognitionError::Status {
                    code: *code,
                    body: String::new(),
                }),
            }
        }
    }

    fn detection(text: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> TextDetection {
        TextDetection {
            text: text.to_string(),
            min_x,
            min_y,
            max_x,
            max_y,
            language: None,
            text_color: None,
        }
    }

    /// 400x300 surface holding an 800x600 image at scale 0.5
    fn setup() -> (Surface, LoadedImage, ResultStore) {
        let mut surface = Surface::new(400, 300, Viewport::default());
        let placement = surface.load_image(RgbaImage::from_pixel(800, 600, Rgba([255, 255, 255, 255])));
        let loaded = LoadedImage {
            placement,
            generation: 1,
        };
        (surface, loaded, ResultStore::new())
    }

    fn draw(session: &mut RecognitionSession, surface: &mut Surface, from: Point, to: Point) -> ObjectId {
        let id = session.begin_selection(surface, from).unwrap();
        session.update_selection(surface, to).unwrap();
        id
    }

    #[tokio::test]
    async fn test_successful_merge() {
        let (mut surface, loaded, mut results) = setup();
        let mut session = RecognitionSession::new(SessionSettings::default());

        let selection = draw(&mut session, &mut surface, Point::new(48.0, 28.0), Point::new(152.0, 82.0));
        let job = session.finish_selection(&mut surface, Some(&loaded)).unwrap().unwrap();
        assert_eq!(session.phase(), SessionPhase::Recognizing);

        let service = FixedService(Ok(RecognitionResult {
            detections: vec![detection("你好", 0.0, 0.0, 20.0, 10.0)],
            detection_size: None,
        }));
        let outcome = session
            .run(&service, job, &mut surface, &mut results, Some(&loaded))
            .await
            .unwrap();

        assert_eq!(outcome, MergeOutcome::Merged { first_label: 0, count: 1 });
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(surface.get(selection).is_none());

        // Crop origin (50, 30) on surface is image (100, 60)
        let merged = results.get(0).unwrap();
        assert!((merged.min_x - 100.0).abs() < 1e-9);
        assert!((merged.min_y - 60.0).abs() < 1e-9);
        assert!((merged.max_x - 140.0).abs() < 1e-9);

        let overlay = surface
            .objects_of(ObjectType::Overlay)
            .find_map(|o| o.as_overlay())
            .unwrap();
        assert!((overlay.bounds.left - 50.0).abs() < 1e-9);
        assert!((overlay.bounds.top - 30.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failure_leaves_results_and_removes_selection() {
        let (mut surface, loaded, mut results) = setup();
        results.append([detection("旧", 0.0, 0.0, 1.0, 1.0)]);
        let mut session = RecognitionSession::new(SessionSettings::default());

        let selection = draw(&mut session, &mut surface, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        let job = session.finish_selection(&mut surface, Some(&loaded)).unwrap().unwrap();

        let err = session
            .run(&FixedService(Err(502)), job, &mut surface, &mut results, Some(&loaded))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Recognition(RecognitionError::Status { code: 502, .. })));
        assert_eq!(results.len(), 1);
        assert!(surface.get(selection).is_none());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_second_selection_rejected_while_recognizing() {
        let (mut surface, loaded, _) = setup();
        let mut session = RecognitionSession::new(SessionSettings::default());

        draw(&mut session, &mut surface, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        session.finish_selection(&mut surface, Some(&loaded)).unwrap().unwrap();

        let before = surface.objects().len();
        assert!(matches!(
            session.begin_selection(&mut surface, Point::new(200.0, 200.0)),
            Err(SessionError::Busy)
        ));
        assert_eq!(surface.objects().len(), before);
    }

    #[test]
    fn test_zero_area_selection_discarded() {
        let (mut surface, loaded, _) = setup();
        let mut session = RecognitionSession::new(SessionSettings::default());

        let selection = session.begin_selection(&mut surface, Point::new(40.0, 40.0)).unwrap();
        let job = session.finish_selection(&mut surface, Some(&loaded)).unwrap();

        assert!(job.is_none());
        assert!(surface.get(selection).is_none());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_no_image_aborts_before_service() {
        let mut surface = Surface::new(400, 300, Viewport::default());
        let mut session = RecognitionSession::new(SessionSettings::default());

        let selection = draw(&mut session, &mut surface, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        assert!(session.finish_selection(&mut surface, None).unwrap().is_none());
        assert!(surface.get(selection).is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_stale_generation_discarded() {
        let (mut surface, loaded, mut results) = setup();
        let mut session = RecognitionSession::new(SessionSettings::default());

        draw(&mut session, &mut surface, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        let job = session.finish_selection(&mut surface, Some(&loaded)).unwrap().unwrap();

        // A new image replaces the document mid-flight
        let placement = surface.load_image(RgbaImage::new(100, 100));
        let replaced = LoadedImage {
            placement,
            generation: 2,
        };

        let outcome = session
            .complete(
                &mut surface,
                &mut results,
                Some(&replaced),
                job.ticket,
                Ok(RecognitionResult {
                    detections: vec![detection("字", 0.0, 0.0, 5.0, 5.0)],
                    detection_size: None,
                }),
            )
            .unwrap();

        assert_eq!(outcome, MergeOutcome::Discarded);
        assert!(results.is_empty());
        assert_eq!(surface.objects_of(ObjectType::Overlay).count(), 0);
    }

    #[test]
    fn test_stale_failure_leaves_new_document_alone() {
        let (mut surface, loaded, mut results) = setup();
        let mut session = RecognitionSession::new(SessionSettings::default());

        let selection = draw(&mut session, &mut surface, Point::new(10.0, 10.0), Point::new(110.0, 60.0));
        let job = session.finish_selection(&mut surface, Some(&loaded)).unwrap().unwrap();

        // Replacement document reusing the selection's id
        let mut other = Surface::new(400, 300, Viewport::default());
        other.load_image(RgbaImage::new(10, 10));
        other.add_object(
            ObjectKind::Overlay(OverlayShape {
                bounds: Rect::new(0.0, 0.0, 5.0, 5.0),
                label: 0,
                text: "旧".into(),
                erasable: false,
                stroke: OverlayStroke::Normal,
            }),
            false,
            false,
        );
        assert_eq!(other.objects()[1].id, selection);
        surface.restore(other.objects().to_vec());
        let before: Vec<_> = surface.objects().iter().map(|o| o.id).collect();
        let replaced = LoadedImage {
            placement: loaded.placement,
            generation: 2,
        };

        let outcome = session
            .complete(
                &mut surface,
                &mut results,
                Some(&replaced),
                job.ticket,
                Err(RecognitionError::Status {
                    code: 500,
                    body: String::new(),
                }),
            )
            .unwrap();

        assert_eq!(outcome, MergeOutcome::Discarded);
        let after: Vec<_> = surface.objects().iter().map(|o| o.id).collect();
        assert_eq!(before, after);
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_unknown_ticket() {
        let (mut surface, loaded, mut results) = setup();
        let mut session = RecognitionSession::new(SessionSettings::default());

        let err = session
            .complete(&mut surface, &mut results, Some(&loaded), 42, Ok(RecognitionResult::default()))
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownTicket(42)));
    }

    #[test]
    fn test_detection_size_height_rescales() {
        let (mut surface, loaded, mut results) = setup();
        let mut session = RecognitionSession::new(SessionSettings {
            detection_size: DetectionSizeMode::Height,
            ..Default::default()
        });

        // Inner crop (50, 30) 100x50
        draw(&mut session, &mut surface, Point::new(48.0, 28.0), Point::new(152.0, 82.0));
        let job = session.finish_selection(&mut surface, Some(&loaded)).unwrap().unwrap();

        session
            .complete(
                &mut surface,
                &mut results,
                Some(&loaded),
                job.ticket,
                Ok(RecognitionResult {
                    detections: vec![detection("字", 20.0, 10.0, 40.0, 30.0)],
                    detection_size: Some(100.0),
                }),
            )
            .unwrap();

        // Service sampled at twice the crop height
        let merged = results.get(0).unwrap();
        assert!((merged.min_x - 120.0).abs() < 1e-9);
        assert!((merged.min_y - 70.0).abs() < 1e-9);
    }
}
