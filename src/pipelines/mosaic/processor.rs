// SPDX-License-Identifier: GPL-3.0-only

//! Frame processor contract
//!
//! The stitching engine is an external collaborator. The orchestration
//! pipeline only depends on this call contract; the engine's feature
//! matching and blending are out of scope.

use std::sync::Arc;

/// One stitching-progress callback payload. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// True at most once per capture: the configured sweep is traversed.
    pub finished: bool,
    /// Panning rate per axis, deg/sec-equivalent
    pub panning_rate_x: f32,
    pub panning_rate_y: f32,
    /// Cumulative swept angle per axis since capture start, degrees
    pub traversed_angle_x: i32,
    pub traversed_angle_y: i32,
}

/// Progress listener registered for the duration of a capture.
///
/// Invoked from whatever context the engine delivers progress on; the
/// coordinating context must not be assumed.
pub type ProgressListener = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Call contract of the stitching engine.
///
/// Implementations are shared across the capture path, the finalize job, and
/// the progress poller, so every method takes `&self` and must tolerate
/// `report_progress` and `update_compass` concurrently with anything else.
/// The orchestration layer guarantees that at most one of frame ingestion,
/// finalize, and reset executes at any instant.
pub trait FrameProcessor: Send + Sync {
    /// Prepare internal buffers for the negotiated preview size.
    fn initialize(&self, width: u32, height: u32);

    /// Consume the frame most recently transferred to CPU memory.
    fn process_frame(&self);

    /// Push the latest 2-axis compass estimate from the sensor context.
    fn update_compass(&self, x: f32, y: f32);

    /// Register or clear the capture progress listener.
    fn set_progress_listener(&self, listener: Option<ProgressListener>);

    /// Combine all ingested frames into the final mosaic.
    fn create_mosaic(&self, high_res: bool);

    /// Take the completed mosaic buffer (NV21 payload plus dimension
    /// trailer), or `None` if no mosaic was produced.
    fn final_mosaic(&self) -> Option<Vec<u8>>;

    /// Current finalize progress: 0-100 for high-res, engine-defined for
    /// the low-res preview pass.
    fn report_progress(&self, high_res: bool) -> i32;

    /// Discard captured frames and compass state for a fresh capture.
    fn reset(&self);

    /// Release engine resources on session teardown.
    fn clear(&self);
}
