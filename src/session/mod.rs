// SPDX-License-Identifier: GPL-3.0-only

//! Panorama capture session orchestration
//!
//! One [`PanoramaSession`] owns the capture state machine, the camera, the
//! frame dispatcher, and the background job runner. All coordination happens
//! on its message loop; other contexts (render surface, sensor feed, worker
//! threads) only ever post [`Message`]s, and the embedding UI observes the
//! session through [`UiEvent`]s.

pub mod dispatcher;
pub mod jobs;
pub mod panning;
pub mod state;

use crate::backends::camera::{CameraDevice, PreviewSize, ViewAngles, select_preview_size};
use crate::backends::handoff::HandoffGate;
use crate::backends::render::RenderSurface;
use crate::config::CaptureConfig;
use crate::constants::{next_power_of_two, thumbnail};
use crate::errors::{CameraError, PanoResult};
use crate::media::exif;
use crate::pipelines::mosaic::{FinalMosaic, FrameProcessor, ProgressSnapshot, finalizer};
use crate::storage::{MosaicStore, Thumbnail};
use dispatcher::FrameDispatcher;
use jobs::{JobKind, JobOutcome, JobRunner, SavedMosaic, spawn_progress_poller};
use state::{CaptureSession, CaptureState, PreviewState};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Everything the session reacts to. Posted from any thread.
#[derive(Debug)]
pub enum Message {
    /// The render surface's preview texture exists; preview can start.
    SurfaceReady,
    /// User pressed the shutter in the viewfinder.
    StartCapture,
    /// User pressed the shutter during capture.
    StopCapture,
    /// User accepted the reviewed mosaic.
    SaveMosaic,
    /// User discarded the reviewed mosaic.
    Retake,
    /// Stitching progress, forwarded from the engine's callback context.
    CaptureProgress(ProgressSnapshot),
    /// Finalize progress from the poller thread, 0-100.
    JobProgress(i32),
    /// A background job's worker thread finished.
    JobFinished(JobKind, JobOutcome),
    /// Shut the session down.
    Teardown,
}

/// What the embedding UI gets told.
#[derive(Debug)]
pub enum UiEvent {
    CaptureStarted,
    CaptureStopped,
    /// Edge-triggered: raised when panning first exceeds the threshold,
    /// lowered when it drops back under.
    TooFastPrompt(bool),
    /// Degrees swept so far, for the capture progress indicator.
    SweepProgress(i32),
    /// Finalize progress while saving, 0-100.
    JobProgress(i32),
    /// Low-res mosaic ready for review.
    ShowFinalMosaic(FinalMosaic),
    /// A finalize attempt produced nothing usable; back to the viewfinder.
    FinalizeFailed(JobKind),
    /// High-res mosaic persisted.
    MosaicSaved {
        handle: crate::storage::ImageHandle,
        thumbnail: Option<Thumbnail>,
    },
    /// Viewfinder is live again after review or a failed finalize.
    ResetToPreview,
    /// Unrecoverable camera failure; the session is gone.
    FatalError(String),
    SessionEnded,
}

/// Cheap handle other contexts use to post messages.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl SessionHandle {
    pub fn post(&self, message: Message) {
        // The session dropping its receiver just means teardown won the race.
        let _ = self.tx.send(message);
    }
}

pub struct PanoramaSession {
    config: CaptureConfig,
    camera: Box<dyn CameraDevice>,
    processor: Arc<dyn FrameProcessor>,
    store: Arc<dyn MosaicStore>,
    dispatcher: Arc<FrameDispatcher>,
    session: CaptureSession,
    runner: JobRunner,
    preview_size: PreviewSize,
    view_angles: ViewAngles,
    too_fast: bool,
    pending_teardown: bool,
    messages_tx: mpsc::UnboundedSender<Message>,
    messages_rx: mpsc::UnboundedReceiver<Message>,
    events_tx: mpsc::UnboundedSender<UiEvent>,
}

impl PanoramaSession {
    /// Negotiate the camera and wire the frame path. The gate must be the
    /// one the render surface signals its CPU-copy completions on. A failure
    /// here is fatal: the session never leaves `Idle` and the camera is
    /// released.
    pub fn new(
        config: CaptureConfig,
        mut camera: Box<dyn CameraDevice>,
        surface: Arc<dyn RenderSurface>,
        gate: Arc<HandoffGate>,
        processor: Arc<dyn FrameProcessor>,
        store: Arc<dyn MosaicStore>,
        events_tx: mpsc::UnboundedSender<UiEvent>,
    ) -> PanoResult<Self> {
        let sizes = camera.supported_preview_sizes();
        let preview_size = match select_preview_size(&sizes) {
            Some(size) => size,
            None => {
                camera.release();
                return Err(CameraError::NoPreviewSize.into());
            }
        };
        if let Err(e) = camera.set_preview_size(preview_size) {
            camera.release();
            return Err(e.into());
        }
        let view_angles = camera.view_angles();
        info!(
            width = preview_size.width,
            height = preview_size.height,
            h_fov = view_angles.horizontal,
            v_fov = view_angles.vertical,
            "Camera negotiated"
        );

        processor.initialize(preview_size.width, preview_size.height);

        let mut session = CaptureSession::new();
        session.enter_viewfinder();

        let dispatcher = Arc::new(FrameDispatcher::new(
            session.state_cell(),
            surface,
            gate,
            Arc::clone(&processor),
        ));

        let (messages_tx, messages_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            camera,
            processor,
            store,
            dispatcher,
            session,
            runner: JobRunner::new(),
            preview_size,
            view_angles,
            too_fast: false,
            pending_teardown: false,
            messages_tx,
            messages_rx,
            events_tx,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.messages_tx.clone(),
        }
    }

    /// The render surface's frame-available callback target.
    pub fn dispatcher(&self) -> Arc<FrameDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn preview_size(&self) -> PreviewSize {
        self.preview_size
    }

    fn emit(&self, event: UiEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Drive the session until teardown.
    pub async fn run(mut self) {
        while let Some(message) = self.messages_rx.recv().await {
            match message {
                Message::SurfaceReady => {
                    if let Err(e) = self.handle_surface_ready() {
                        error!("Preview startup failed: {e}");
                        self.camera.release();
                        self.emit(UiEvent::FatalError(e.to_string()));
                        break;
                    }
                }
                Message::StartCapture => self.handle_start_capture(),
                Message::StopCapture => self.handle_stop_capture(),
                Message::SaveMosaic => self.handle_save_mosaic(),
                Message::Retake => self.handle_retake(),
                Message::CaptureProgress(snapshot) => self.handle_capture_progress(snapshot),
                Message::JobProgress(progress) => self.emit(UiEvent::JobProgress(progress)),
                Message::JobFinished(kind, outcome) => {
                    self.handle_job_finished(kind, outcome);
                    if self.pending_teardown && self.handle_teardown() {
                        break;
                    }
                }
                Message::Teardown => {
                    if self.handle_teardown() {
                        break;
                    }
                }
            }
        }
    }

    fn handle_surface_ready(&mut self) -> Result<(), CameraError> {
        if self.session.preview() == PreviewState::Active {
            return Ok(());
        }
        self.camera.attach_preview_target()?;
        self.camera.start_preview()?;
        self.session.set_preview(PreviewState::Active);
        info!("Live preview started");
        Ok(())
    }

    fn handle_start_capture(&mut self) {
        if self.session.preview() != PreviewState::Active {
            warn!("Capture requested before the preview surface is ready");
            return;
        }
        if self.runner.is_running() {
            warn!("Capture requested while a finalize job is in flight");
            return;
        }
        if !self.session.begin_capture() {
            return;
        }

        self.processor.reset();
        self.too_fast = false;

        let tx = self.messages_tx.clone();
        self.processor.set_progress_listener(Some(Arc::new(move |snapshot| {
            let _ = tx.send(Message::CaptureProgress(snapshot));
        })));

        self.emit(UiEvent::CaptureStarted);
    }

    fn handle_capture_progress(&mut self, snapshot: ProgressSnapshot) {
        // Late callbacks can trail the transition out of Capturing.
        if self.session.state() != CaptureState::Capturing {
            debug!("Stale capture progress ignored");
            return;
        }

        if snapshot.finished {
            info!("Sweep complete, stopping capture");
            self.handle_stop_capture();
            return;
        }

        let too_fast = panning::panning_too_fast(
            snapshot.panning_rate_x,
            snapshot.panning_rate_y,
            self.view_angles,
            self.config.panning_speed_threshold,
        );
        if too_fast != self.too_fast {
            self.too_fast = too_fast;
            self.emit(UiEvent::TooFastPrompt(too_fast));
        }

        let swept = snapshot
            .traversed_angle_x
            .max(snapshot.traversed_angle_y)
            + 1;
        self.emit(UiEvent::SweepProgress(swept));
    }

    fn handle_stop_capture(&mut self) {
        if !self.session.end_capture() {
            return;
        }
        self.processor.set_progress_listener(None);
        if self.too_fast {
            self.too_fast = false;
            self.emit(UiEvent::TooFastPrompt(false));
        }
        self.emit(UiEvent::CaptureStopped);

        // The preview freezes for review and the engine belongs to the job
        // until the review resolves.
        self.camera.stop_preview();
        self.session.set_preview(PreviewState::Stopped);
        self.dispatcher.set_enabled(false);

        let processor = Arc::clone(&self.processor);
        let quality = self.config.jpeg_quality;
        let done = self.job_done();
        let submitted = self.runner.submit(
            JobKind::FinalizePreview,
            move || {
                let mosaic = match finalizer::generate_final_mosaic(&*processor, false, quality) {
                    Ok(mosaic) => Some(mosaic),
                    Err(e) => {
                        error!("Preview finalize failed: {e}");
                        None
                    }
                };
                JobOutcome::PreviewReady(mosaic)
            },
            done,
        );
        match submitted {
            Ok(()) => self.spawn_poller(false),
            // Single-flight violated would be a logic bug; recover to preview.
            Err(_) => self.reset_to_preview(),
        }
    }

    fn handle_save_mosaic(&mut self) {
        if self.session.state() != CaptureState::Viewfinder || self.runner.is_running() {
            warn!("Save requested in an unexpected state");
            return;
        }
        let taken_at = self
            .session
            .capture_started_at()
            .unwrap_or_else(SystemTime::now);

        let processor = Arc::clone(&self.processor);
        let store = Arc::clone(&self.store);
        let quality = self.config.jpeg_quality;
        let preview_height = self.preview_size.height;
        let done = self.job_done();
        let submitted = self.runner.submit(
            JobKind::FinalizeAndSave,
            move || {
                JobOutcome::SaveFinished(save_mosaic(
                    &*processor,
                    &*store,
                    taken_at,
                    quality,
                    preview_height,
                ))
            },
            done,
        );

        match submitted {
            Ok(()) => self.spawn_poller(true),
            Err(_) => self.reset_to_preview(),
        }
    }

    fn spawn_poller(&self, high_res: bool) {
        let tx = self.messages_tx.clone();
        // The poller winds itself down when the running flag drops.
        let _ = spawn_progress_poller(
            self.runner.running_flag(),
            Arc::clone(&self.processor),
            high_res,
            self.config.poll_interval(),
            move |progress| {
                let _ = tx.send(Message::JobProgress(progress));
            },
        );
    }

    fn handle_retake(&mut self) {
        if self.runner.is_running() {
            warn!("Retake requested while a finalize job is in flight");
            return;
        }
        if self.session.state() != CaptureState::Viewfinder {
            return;
        }
        self.reset_to_preview();
    }

    fn handle_job_finished(&mut self, kind: JobKind, outcome: JobOutcome) {
        self.runner.acknowledge(kind);
        if self.pending_teardown {
            debug!(?kind, "Job outcome discarded, teardown pending");
            return;
        }
        match outcome {
            JobOutcome::PreviewReady(Some(mosaic)) => {
                self.emit(UiEvent::ShowFinalMosaic(mosaic));
            }
            JobOutcome::PreviewReady(None) => {
                self.emit(UiEvent::FinalizeFailed(kind));
                self.reset_to_preview();
            }
            JobOutcome::SaveFinished(Some(saved)) => {
                self.emit(UiEvent::MosaicSaved {
                    handle: saved.handle,
                    thumbnail: saved.thumbnail,
                });
                self.reset_to_preview();
            }
            JobOutcome::SaveFinished(None) => {
                self.emit(UiEvent::FinalizeFailed(kind));
                self.reset_to_preview();
            }
        }
    }

    fn reset_to_preview(&mut self) {
        self.processor.reset();
        self.too_fast = false;
        self.dispatcher.set_enabled(true);
        if self.session.preview() == PreviewState::Stopped {
            match self.camera.start_preview() {
                Ok(()) => self.session.set_preview(PreviewState::Active),
                Err(e) => {
                    error!("Restarting preview failed: {e}");
                    self.camera.release();
                    self.emit(UiEvent::FatalError(e.to_string()));
                    return;
                }
            }
        }
        self.emit(UiEvent::ResetToPreview);
    }

    /// Tear the session down, or defer until the running job's completion
    /// message is processed. The engine must never be cleared while a
    /// finalize owns it. Returns true once the session has actually ended.
    fn handle_teardown(&mut self) -> bool {
        if self.runner.is_running() {
            info!(job = ?self.runner.active(), "Teardown deferred until the running job completes");
            self.pending_teardown = true;
            return false;
        }
        if self.session.end_capture() {
            self.processor.set_progress_listener(None);
        }
        self.camera.stop_preview();
        self.camera.release();
        self.session.set_preview(PreviewState::Stopped);
        self.processor.clear();
        info!("Session torn down");
        self.emit(UiEvent::SessionEnded);
        true
    }

    /// Completion callback a worker runs to post its outcome back here.
    fn job_done(&self) -> impl FnOnce(JobKind, JobOutcome) + Send + 'static {
        let tx = self.messages_tx.clone();
        move |kind, outcome| {
            let _ = tx.send(Message::JobFinished(kind, outcome));
        }
    }
}

/// High-res finalize, persist, and thumbnail. Runs on the worker thread.
fn save_mosaic(
    processor: &dyn FrameProcessor,
    store: &dyn MosaicStore,
    taken_at: SystemTime,
    quality: u8,
    preview_height: u32,
) -> Option<SavedMosaic> {
    let mosaic = match finalizer::generate_final_mosaic(processor, true, quality) {
        Ok(mosaic) => mosaic,
        Err(e) => {
            error!("High-res finalize failed: {e}");
            return None;
        }
    };

    let orientation = exif::orientation(&mosaic.jpeg);
    let handle = match store.save(&mosaic.jpeg, taken_at, orientation) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Saving panorama failed: {e}");
            return None;
        }
    };

    // Thumbnails stay under the target edge relative to the preview height.
    let ratio = thumbnail::TARGET_EDGE.div_ceil(preview_height.max(1));
    let sample_size = next_power_of_two(ratio);
    let thumbnail = match store.make_thumbnail(&mosaic.jpeg, orientation, sample_size, &handle) {
        Ok(thumbnail) => Some(thumbnail),
        Err(e) => {
            // The panorama is on disk; a missing thumbnail is cosmetic.
            warn!("Thumbnail derivation failed: {e}");
            None
        }
    };

    Some(SavedMosaic { handle, thumbnail })
}
