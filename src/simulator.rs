// SPDX-License-Identifier: GPL-3.0-only

//! Simulated collaborators
//!
//! In-process stand-ins for the camera, the GPU render surface, and the
//! stitching engine, so the whole capture pipeline can run end to end on a
//! development machine. The demo binary and the integration tests both drive
//! the real orchestration code through these.

use crate::backends::camera::{CameraDevice, PreviewSize, ViewAngles};
use crate::backends::handoff::HandoffGate;
use crate::backends::render::{IDENTITY_TRANSFORM, RenderSurface, TransformMatrix};
use crate::errors::CameraError;
use crate::pipelines::mosaic::{FrameProcessor, ProgressListener, ProgressSnapshot, codec};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Camera reporting a fixed size table, never failing.
pub struct SimCamera {
    sizes: Vec<PreviewSize>,
    preview_running: bool,
}

impl SimCamera {
    pub fn new() -> Self {
        Self {
            sizes: vec![
                PreviewSize {
                    width: 1280,
                    height: 720,
                },
                PreviewSize {
                    width: 960,
                    height: 720,
                },
                PreviewSize {
                    width: 640,
                    height: 480,
                },
            ],
            preview_running: false,
        }
    }
}

impl Default for SimCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDevice for SimCamera {
    fn supported_preview_sizes(&self) -> Vec<PreviewSize> {
        self.sizes.clone()
    }

    fn set_preview_size(&mut self, size: PreviewSize) -> Result<(), CameraError> {
        debug!(width = size.width, height = size.height, "Preview size set");
        Ok(())
    }

    fn view_angles(&self) -> ViewAngles {
        ViewAngles {
            horizontal: 60.0,
            vertical: 45.0,
        }
    }

    fn attach_preview_target(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.preview_running = true;
        Ok(())
    }

    fn stop_preview(&mut self) {
        self.preview_running = false;
    }

    fn release(&mut self) {
        self.preview_running = false;
        info!("Simulated camera released");
    }
}

/// Render surface that completes CPU transfers from a helper thread, the way
/// a real render context signals from its own loop.
pub struct SimRenderSurface {
    gate: Arc<HandoffGate>,
    transform: Mutex<TransformMatrix>,
    warping: AtomicBool,
    preprocessed: AtomicU32,
    transferred: AtomicU32,
}

impl SimRenderSurface {
    pub fn new(gate: Arc<HandoffGate>) -> Self {
        Self {
            gate,
            transform: Mutex::new(IDENTITY_TRANSFORM),
            warping: AtomicBool::new(false),
            preprocessed: AtomicU32::new(0),
            transferred: AtomicU32::new(0),
        }
    }

    /// Install the transform the next notification will carry.
    pub fn set_transform(&self, transform: TransformMatrix) {
        *self.transform.lock().unwrap() = transform;
    }

    pub fn preprocessed_frames(&self) -> u32 {
        self.preprocessed.load(Ordering::Acquire)
    }

    pub fn transferred_frames(&self) -> u32 {
        self.transferred.load(Ordering::Acquire)
    }

    /// Whether the last routed frame asked for warped rendering.
    pub fn is_warping(&self) -> bool {
        self.warping.load(Ordering::Acquire)
    }
}

impl RenderSurface for SimRenderSurface {
    fn set_warping(&self, enabled: bool) {
        self.warping.store(enabled, Ordering::Release);
    }

    fn preprocess(&self, _transform: &TransformMatrix) {
        self.preprocessed.fetch_add(1, Ordering::AcqRel);
    }

    fn transfer_to_cpu(&self) {
        self.transferred.fetch_add(1, Ordering::AcqRel);
        let gate = Arc::clone(&self.gate);
        // The waiter holds the gate slot; completion has to come from
        // another context, as it does from a real render loop.
        std::thread::spawn(move || gate.complete_transfer());
    }

    fn transform_matrix(&self) -> TransformMatrix {
        *self.transform.lock().unwrap()
    }
}

/// Stitching engine stand-in.
///
/// Counts ingested frames, raises progress callbacks as the compass sweeps,
/// and renders a flat gray panorama whose width grows with the frame count.
pub struct SimProcessor {
    sweep_angle: i32,
    frames: AtomicU32,
    listener: Mutex<Option<ProgressListener>>,
    last_compass: Mutex<(f32, f32)>,
    mosaic: Mutex<Option<Vec<u8>>>,
    finalize_progress: AtomicI32,
}

impl SimProcessor {
    pub fn new(sweep_angle: i32) -> Self {
        Self {
            sweep_angle,
            frames: AtomicU32::new(0),
            listener: Mutex::new(None),
            last_compass: Mutex::new((0.0, 0.0)),
            mosaic: Mutex::new(None),
            finalize_progress: AtomicI32::new(0),
        }
    }

    pub fn frames_ingested(&self) -> u32 {
        self.frames.load(Ordering::Acquire)
    }

    /// Panorama dimensions for the current frame count. Width grows with
    /// the sweep; height matches a 4:3 capture row.
    fn mosaic_dimensions(&self) -> (i32, i32) {
        let frames = self.frames.load(Ordering::Acquire).max(1) as i32;
        ((64 * frames).min(4096), 48)
    }
}

impl FrameProcessor for SimProcessor {
    fn initialize(&self, width: u32, height: u32) {
        info!(width, height, "Simulated engine initialized");
    }

    fn process_frame(&self) {
        self.frames.fetch_add(1, Ordering::AcqRel);
    }

    fn update_compass(&self, x: f32, y: f32) {
        let (rate_x, rate_y) = {
            let mut last = self.last_compass.lock().unwrap();
            let rates = (x - last.0, y - last.1);
            *last = (x, y);
            rates
        };

        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(ProgressSnapshot {
                finished: x.abs() as i32 >= self.sweep_angle,
                panning_rate_x: rate_x,
                panning_rate_y: rate_y,
                traversed_angle_x: x.abs() as i32,
                traversed_angle_y: y.abs() as i32,
            });
        }
    }

    fn set_progress_listener(&self, listener: Option<ProgressListener>) {
        *self.listener.lock().unwrap() = listener;
    }

    fn create_mosaic(&self, high_res: bool) {
        let (width, height) = self.mosaic_dimensions();
        debug!(width, height, high_res, "Simulated mosaic render");
        let payload =
            vec![0x80u8; crate::pipelines::mosaic::MosaicImage::expected_payload_len(width, height)];
        *self.mosaic.lock().unwrap() = Some(codec::encode(&payload, width, height));
        self.finalize_progress.store(100, Ordering::Release);
    }

    fn final_mosaic(&self) -> Option<Vec<u8>> {
        self.mosaic.lock().unwrap().take()
    }

    fn report_progress(&self, _high_res: bool) -> i32 {
        self.finalize_progress.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.frames.store(0, Ordering::Release);
        self.finalize_progress.store(0, Ordering::Release);
        *self.last_compass.lock().unwrap() = (0.0, 0.0);
        *self.mosaic.lock().unwrap() = None;
    }

    fn clear(&self) {
        self.reset();
        *self.listener.lock().unwrap() = None;
    }
}
