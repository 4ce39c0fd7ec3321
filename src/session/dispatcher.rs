// SPDX-License-Identifier: GPL-3.0-only

//! Frame availability dispatcher
//!
//! The render surface announces new frames from its own thread, possibly
//! concurrently with state transitions. A per-dispatcher mutex serializes the
//! notifications so each is handled exactly once, in arrival order, against a
//! single consistent state read.

use crate::backends::handoff::HandoffGate;
use crate::backends::render::RenderSurface;
use crate::pipelines::mosaic::FrameProcessor;
use crate::session::state::{CaptureState, StateCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

pub struct FrameDispatcher {
    /// Serializes notification handling; not shared with any other lock.
    serial: Mutex<()>,
    state: Arc<StateCell>,
    surface: Arc<dyn RenderSurface>,
    gate: Arc<HandoffGate>,
    processor: Arc<dyn FrameProcessor>,
    enabled: AtomicBool,
}

impl FrameDispatcher {
    pub fn new(
        state: Arc<StateCell>,
        surface: Arc<dyn RenderSurface>,
        gate: Arc<HandoffGate>,
        processor: Arc<dyn FrameProcessor>,
    ) -> Self {
        Self {
            serial: Mutex::new(()),
            state,
            surface,
            gate,
            processor,
            enabled: AtomicBool::new(true),
        }
    }

    /// Detach or reattach frame routing. Disabled while a finalize job owns
    /// the stitching engine; re-enabled on reset to preview.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Entry point for the render surface's "new frame" notification.
    ///
    /// Safe to call from any thread at any time. A notification arriving
    /// while a previous one is in flight blocks here until the earlier
    /// handoff completes; backpressure, not dropping, bounds the producer.
    pub fn on_frame_available(&self) {
        let _serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.enabled.load(Ordering::Acquire) {
            trace!("Frame notification ignored: dispatcher detached");
            return;
        }

        // The transform must belong to the frame that raised this
        // notification, so fetch it before anything else.
        let transform = self.surface.transform_matrix();

        match self.state.load() {
            CaptureState::Idle => trace!("Frame notification ignored in Idle"),
            CaptureState::Viewfinder => self.run_viewfinder(&transform),
            CaptureState::Capturing => self.run_capture(&transform),
        }
    }

    /// Render-only path: no CPU transfer, no engine call.
    fn run_viewfinder(&self, transform: &crate::backends::render::TransformMatrix) {
        self.surface.set_warping(false);
        self.surface.preprocess(transform);
    }

    /// Capture path: preprocess, hand the frame off to CPU memory, then let
    /// the stitching engine consume it. The gate is taken before the
    /// transfer request so the completion signal cannot be missed, and the
    /// engine never sees two frames' data interleaved.
    fn run_capture(&self, transform: &crate::backends::render::TransformMatrix) {
        self.surface.set_warping(true);
        self.surface.preprocess(transform);

        let pending = self.gate.begin_transfer();
        self.surface.transfer_to_cpu();
        pending.wait_ready();

        self.processor.process_frame();
    }
}
