//! OCR Annotator - image annotation with region text recognition
//!
//! Loads an image onto a drawing surface, recognises text in user-drawn
//! regions through a remote service and overlays the detections on the
//! image.
//!
//! Three coordinate spaces are in play: surface space (the drawing
//! surface), image space (pixels of the loaded original) and recognition
//! space (pixels of the crop sent to the service). [`geometry`] holds the
//! conversions between them, [`extract`] cuts crops, [`session`] drives one
//! recognition at a time and [`app::Annotator`] ties them to pointer input.

pub mod app;
pub mod config;
pub mod extract;
pub mod geometry;
pub mod input;
pub mod overlay;
pub mod recognition;
pub mod results;
pub mod session;
pub mod storage;
pub mod surface;
