// SPDX-License-Identifier: GPL-3.0-only

//! Camera device contract and preview size selection
//!
//! Hardware parameter negotiation happens behind [`CameraDevice`]; the
//! orchestrator only picks a preview size and drives the preview lifecycle.

use crate::constants::DEFAULT_CAPTURE_PIXELS;
use crate::errors::CameraError;
use tracing::{debug, warn};

/// One preview resolution the camera supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

impl PreviewSize {
    pub fn pixels(&self) -> u32 {
        self.width * self.height
    }
}

/// Horizontal and vertical fields of view in degrees, used to scale panning
/// rates for the too-fast check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAngles {
    pub horizontal: f32,
    pub vertical: f32,
}

/// Camera hardware collaborator.
///
/// All calls happen on the coordinating context. A setup failure is fatal to
/// the session; preview start/stop failures after setup release the device.
pub trait CameraDevice: Send {
    /// Preview sizes the device supports.
    fn supported_preview_sizes(&self) -> Vec<PreviewSize>;

    /// Apply the negotiated preview size.
    fn set_preview_size(&mut self, size: PreviewSize) -> Result<(), CameraError>;

    /// Fields of view for the configured size.
    fn view_angles(&self) -> ViewAngles;

    /// Point the preview feed at the render surface's texture.
    fn attach_preview_target(&mut self) -> Result<(), CameraError>;

    /// Start delivering preview frames.
    fn start_preview(&mut self) -> Result<(), CameraError>;

    /// Stop delivering preview frames. Idempotent.
    fn stop_preview(&mut self);

    /// Release the device on teardown.
    fn release(&mut self);
}

/// Find the supported size closest to the capture target.
///
/// `need_4_3` restricts to 4:3 sizes; `need_smaller` refuses anything above
/// the 960x720 pixel cap.
fn find_best_preview_size(
    sizes: &[PreviewSize],
    need_4_3: bool,
    need_smaller: bool,
) -> Option<PreviewSize> {
    let mut best: Option<PreviewSize> = None;
    let mut pixels_diff = i64::MAX;

    for size in sizes {
        let d = DEFAULT_CAPTURE_PIXELS as i64 - size.pixels() as i64;
        if need_smaller && d < 0 {
            continue;
        }
        if need_4_3 && size.height * 4 != size.width * 3 {
            continue;
        }
        let d = d.abs();
        if d < pixels_diff {
            pixels_diff = d;
            best = Some(*size);
        }
    }
    best
}

/// Pick the preview size for capture: prefer 4:3 at or below 960x720, fall
/// back to any aspect at or below the cap, then to whatever is closest.
pub fn select_preview_size(sizes: &[PreviewSize]) -> Option<PreviewSize> {
    if let Some(size) = find_best_preview_size(sizes, true, true) {
        return Some(size);
    }
    warn!("No 4:3 ratio preview size supported");
    if let Some(size) = find_best_preview_size(sizes, false, true) {
        return Some(size);
    }
    warn!("Can't find a supported preview size smaller than 960x720");
    let size = find_best_preview_size(sizes, false, false);
    debug!(?size, "Preview size fallback selection");
    size
}
