//! Scan-line effect for pending recognition regions
//!
//! The host render loop asks for the sweep position once per frame; the
//! selection object itself holds no animation state.

use std::time::Duration;

/// One sweep from left to right
pub const SCAN_PERIOD: Duration = Duration::from_millis(1000);

/// Half width of the highlight gradient
pub const SCAN_GRADIENT_HALF_WIDTH: f64 = 10.0;

/// What to draw for the scan line in one frame, in selection-local units
/// measured from the selection's horizontal centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanLineFrame {
    /// Centre of the highlight
    pub x: f64,
    /// Gradient start
    pub gradient_start: f64,
    /// Gradient end
    pub gradient_end: f64,
}

/// Sweep position after `elapsed` for a selection of `width`.
///
/// The line travels linearly from `-width` to `width` and restarts.
pub fn scan_line_at(elapsed: Duration, width: f64) -> ScanLineFrame {
    let period = SCAN_PERIOD.as_secs_f64();
    let progress = (elapsed.as_secs_f64() % period) / period;
    let x = -width + 2.0 * width * progress;

    ScanLineFrame {
        x,
        gradient_start: x - SCAN_GRADIENT_HALF_WIDTH,
        gradient_end: x + SCAN_GRADIENT_HALF_WIDTH,
    }
}
