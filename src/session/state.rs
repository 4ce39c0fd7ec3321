// SPDX-License-Identifier: GPL-3.0-only

//! Capture session state
//!
//! `Idle -> Viewfinder <-> Capturing`, owned by the coordinating context.
//! The current state is mirrored into an atomic cell so the frame dispatcher
//! can route notifications with a lock-free, consistent read from the render
//! thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Capture pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CaptureState {
    /// Camera not set up; frame notifications are ignored.
    Idle = 0,
    /// Live preview; frames take the render-only path.
    Viewfinder = 1,
    /// Frames take the capture path into the stitching engine.
    Capturing = 2,
}

/// Live camera preview feed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    Stopped,
    Active,
}

/// Lock-free mirror of [`CaptureState`] for non-coordinating contexts.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: CaptureState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn store(&self, state: CaptureState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub fn load(&self) -> CaptureState {
        match self.0.load(Ordering::Acquire) {
            1 => CaptureState::Viewfinder,
            2 => CaptureState::Capturing,
            _ => CaptureState::Idle,
        }
    }
}

/// The capture session owned by the orchestrator.
#[derive(Debug)]
pub struct CaptureSession {
    state: CaptureState,
    preview: PreviewState,
    capture_started_at: Option<SystemTime>,
    shared: Arc<StateCell>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            preview: PreviewState::Stopped,
            capture_started_at: None,
            shared: Arc::new(StateCell::new(CaptureState::Idle)),
        }
    }

    /// Handle for the dispatcher's state reads.
    pub fn state_cell(&self) -> Arc<StateCell> {
        Arc::clone(&self.shared)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn preview(&self) -> PreviewState {
        self.preview
    }

    /// Wall-clock time capture started, for file naming.
    pub fn capture_started_at(&self) -> Option<SystemTime> {
        self.capture_started_at
    }

    fn transition(&mut self, to: CaptureState) {
        debug!(from = ?self.state, ?to, "Capture state transition");
        self.state = to;
        self.shared.store(to);
    }

    /// `Idle -> Viewfinder`, after successful camera setup.
    pub fn enter_viewfinder(&mut self) {
        if self.state != CaptureState::Idle {
            warn!(state = ?self.state, "enter_viewfinder outside Idle");
            return;
        }
        self.transition(CaptureState::Viewfinder);
    }

    /// `Viewfinder -> Capturing`. Records the session start time. The
    /// orchestrator checks the job and surface preconditions first.
    pub fn begin_capture(&mut self) -> bool {
        if self.state != CaptureState::Viewfinder {
            warn!(state = ?self.state, "begin_capture outside Viewfinder");
            return false;
        }
        self.capture_started_at = Some(SystemTime::now());
        self.transition(CaptureState::Capturing);
        true
    }

    /// `Capturing -> Viewfinder`, on explicit stop or sweep completion.
    pub fn end_capture(&mut self) -> bool {
        if self.state != CaptureState::Capturing {
            return false;
        }
        self.transition(CaptureState::Viewfinder);
        true
    }

    pub fn set_preview(&mut self, preview: PreviewState) {
        self.preview = preview;
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}
