// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end session tests against the simulated collaborators.

use panorama::backends::camera::{CameraDevice, PreviewSize, ViewAngles};
use panorama::backends::handoff::HandoffGate;
use panorama::config::CaptureConfig;
use panorama::errors::{CameraError, PanoramaError};
use panorama::pipelines::mosaic::FrameProcessor;
use panorama::session::dispatcher::FrameDispatcher;
use panorama::session::state::CaptureSession;
use panorama::session::{Message, PanoramaSession, UiEvent};
use panorama::simulator::{SimCamera, SimProcessor, SimRenderSurface};
use panorama::storage::FsMosaicStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const EVENT_WAIT: Duration = Duration::from_secs(10);

struct Harness {
    handle: panorama::SessionHandle,
    dispatcher: Arc<FrameDispatcher>,
    processor: Arc<SimProcessor>,
    surface: Arc<SimRenderSurface>,
    events: mpsc::UnboundedReceiver<UiEvent>,
    _dir: tempfile::TempDir,
    save_dir: std::path::PathBuf,
}

fn start_session(sweep_angle: i32) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let save_dir = dir.path().to_path_buf();

    let mut config = CaptureConfig::default();
    config.sweep_angle = sweep_angle;
    config.save_dir = Some(save_dir.clone());

    let gate = Arc::new(HandoffGate::new());
    let surface = Arc::new(SimRenderSurface::new(Arc::clone(&gate)));
    let processor = Arc::new(SimProcessor::new(sweep_angle));
    let store = Arc::new(FsMosaicStore::new(save_dir.clone()));

    let (events_tx, events) = mpsc::unbounded_channel();
    let surface_obj: Arc<dyn panorama::backends::render::RenderSurface> = surface.clone();
    let processor_obj: Arc<dyn FrameProcessor> = processor.clone();
    let session = PanoramaSession::new(
        config,
        Box::new(SimCamera::new()),
        surface_obj,
        gate,
        processor_obj,
        store,
        events_tx,
    )
    .unwrap();

    let handle = session.handle();
    let dispatcher = session.dispatcher();
    tokio::spawn(session.run());

    Harness {
        handle,
        dispatcher,
        processor,
        surface,
        events,
        _dir: dir,
        save_dir,
    }
}

async fn next_event(harness: &mut Harness) -> UiEvent {
    timeout(EVENT_WAIT, harness.events.recv())
        .await
        .expect("event wait timed out")
        .expect("event channel closed")
}

/// Recv until `pred` matches, returning every event seen on the way.
async fn events_until(
    harness: &mut Harness,
    pred: impl Fn(&UiEvent) -> bool,
) -> Vec<UiEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(harness).await;
        let hit = pred(&event);
        seen.push(event);
        if hit {
            return seen;
        }
    }
}

/// Deliver one frame notification from a non-async thread, the way the
/// render surface would.
fn deliver_frame(dispatcher: &Arc<FrameDispatcher>) {
    let dispatcher = Arc::clone(dispatcher);
    std::thread::spawn(move || dispatcher.on_frame_available())
        .join()
        .unwrap();
}

#[tokio::test]
async fn test_capture_review_save_round_trip() {
    let mut harness = start_session(10);
    harness.handle.post(Message::SurfaceReady);
    harness.handle.post(Message::StartCapture);
    events_until(&mut harness, |e| matches!(e, UiEvent::CaptureStarted)).await;

    // Frames flow into the engine while capturing.
    deliver_frame(&harness.dispatcher);
    deliver_frame(&harness.dispatcher);
    assert_eq!(harness.processor.frames_ingested(), 2);
    assert_eq!(harness.surface.transferred_frames(), 2);

    // Sweep to completion: the engine's progress callback stops capture.
    harness.processor.update_compass(4.0, 0.0);
    harness.processor.update_compass(11.0, 0.0);
    let seen = events_until(&mut harness, |e| {
        matches!(e, UiEvent::ShowFinalMosaic(_))
    })
    .await;
    assert!(
        seen.iter().any(|e| matches!(e, UiEvent::CaptureStopped)),
        "capture did not stop before review"
    );
    assert!(
        seen.iter()
            .any(|e| matches!(e, UiEvent::SweepProgress(p) if *p >= 4)),
        "no sweep progress surfaced"
    );

    // Frames raised while the finalize job owns the engine must not reach it.
    let ingested = harness.processor.frames_ingested();
    deliver_frame(&harness.dispatcher);
    assert_eq!(harness.processor.frames_ingested(), ingested);

    harness.handle.post(Message::SaveMosaic);
    let seen = events_until(&mut harness, |e| matches!(e, UiEvent::MosaicSaved { .. })).await;
    let UiEvent::MosaicSaved { handle, thumbnail } = seen.last().unwrap() else {
        unreachable!()
    };
    assert!(handle.0.starts_with(&harness.save_dir));
    assert!(handle.0.exists());
    assert!(thumbnail.is_some());

    events_until(&mut harness, |e| matches!(e, UiEvent::ResetToPreview)).await;

    harness.handle.post(Message::Teardown);
    events_until(&mut harness, |e| matches!(e, UiEvent::SessionEnded)).await;
}

#[tokio::test]
async fn test_capture_refused_while_finalize_in_flight() {
    let mut harness = start_session(10);
    harness.handle.post(Message::SurfaceReady);
    harness.handle.post(Message::StartCapture);
    events_until(&mut harness, |e| matches!(e, UiEvent::CaptureStarted)).await;

    deliver_frame(&harness.dispatcher);
    harness.handle.post(Message::StopCapture);
    // Posted while the preview finalize job runs; must not start a capture
    // ahead of the review.
    harness.handle.post(Message::StartCapture);

    let seen = events_until(&mut harness, |e| {
        matches!(e, UiEvent::ShowFinalMosaic(_))
    })
    .await;
    assert!(
        !seen.iter().any(|e| matches!(e, UiEvent::CaptureStarted)),
        "capture restarted while the engine was finalizing"
    );

    // Same guard during the save job: a shutter press between the save
    // request and its completion must not start a capture.
    harness.handle.post(Message::SaveMosaic);
    harness.handle.post(Message::StartCapture);
    let seen = events_until(&mut harness, |e| matches!(e, UiEvent::MosaicSaved { .. })).await;
    assert!(
        !seen.iter().any(|e| matches!(e, UiEvent::CaptureStarted)),
        "capture restarted while the save job owned the engine"
    );

    harness.handle.post(Message::Teardown);
    events_until(&mut harness, |e| matches!(e, UiEvent::SessionEnded)).await;
}

#[tokio::test]
async fn test_retake_discards_and_returns_to_viewfinder() {
    let mut harness = start_session(10);
    harness.handle.post(Message::SurfaceReady);
    harness.handle.post(Message::StartCapture);
    events_until(&mut harness, |e| matches!(e, UiEvent::CaptureStarted)).await;

    deliver_frame(&harness.dispatcher);
    harness.handle.post(Message::StopCapture);
    events_until(&mut harness, |e| matches!(e, UiEvent::ShowFinalMosaic(_))).await;

    harness.handle.post(Message::Retake);
    events_until(&mut harness, |e| matches!(e, UiEvent::ResetToPreview)).await;
    assert_eq!(harness.processor.frames_ingested(), 0);

    // The viewfinder is live again: a fresh capture works.
    harness.handle.post(Message::StartCapture);
    events_until(&mut harness, |e| matches!(e, UiEvent::CaptureStarted)).await;
    deliver_frame(&harness.dispatcher);
    assert_eq!(harness.processor.frames_ingested(), 1);

    harness.handle.post(Message::Teardown);
    events_until(&mut harness, |e| matches!(e, UiEvent::SessionEnded)).await;
}

#[tokio::test]
async fn test_too_fast_prompt_is_edge_triggered() {
    let mut harness = start_session(500);
    harness.handle.post(Message::SurfaceReady);
    harness.handle.post(Message::StartCapture);
    events_until(&mut harness, |e| matches!(e, UiEvent::CaptureStarted)).await;

    // 60 degree horizontal FOV: a 1.0 deg jump scales to 60 > 30.
    harness.processor.update_compass(1.0, 0.0);
    events_until(&mut harness, |e| matches!(e, UiEvent::TooFastPrompt(true))).await;

    // Still fast: no second raise before the rate drops.
    harness.processor.update_compass(2.0, 0.0);
    harness.processor.update_compass(2.1, 0.0);
    let seen = events_until(&mut harness, |e| {
        matches!(e, UiEvent::TooFastPrompt(false))
    })
    .await;
    assert!(
        !seen
            .iter()
            .any(|e| matches!(e, UiEvent::TooFastPrompt(true))),
        "prompt raised twice without a drop in between"
    );

    harness.handle.post(Message::Teardown);
    events_until(&mut harness, |e| matches!(e, UiEvent::SessionEnded)).await;
}

/// Engine whose finalize blocks until released, recording the order of
/// finalize and clear calls.
struct SlowEngine {
    release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    log: std::sync::Mutex<Vec<&'static str>>,
}

impl SlowEngine {
    fn new() -> (Arc<Self>, std::sync::mpsc::Sender<()>) {
        let (tx, rx) = std::sync::mpsc::channel();
        let engine = Arc::new(Self {
            release: std::sync::Mutex::new(rx),
            log: std::sync::Mutex::new(Vec::new()),
        });
        (engine, tx)
    }

    fn log(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }
}

impl FrameProcessor for SlowEngine {
    fn initialize(&self, _width: u32, _height: u32) {}
    fn process_frame(&self) {}
    fn update_compass(&self, _x: f32, _y: f32) {}
    fn set_progress_listener(
        &self,
        _listener: Option<panorama::pipelines::mosaic::ProgressListener>,
    ) {
    }
    fn create_mosaic(&self, _high_res: bool) {
        self.log.lock().unwrap().push("finalize_start");
        self.release.lock().unwrap().recv().unwrap();
        self.log.lock().unwrap().push("finalize_end");
    }
    fn final_mosaic(&self) -> Option<Vec<u8>> {
        None
    }
    fn report_progress(&self, _high_res: bool) -> i32 {
        0
    }
    fn reset(&self) {}
    fn clear(&self) {
        self.log.lock().unwrap().push("clear");
    }
}

#[tokio::test]
async fn test_teardown_defers_to_running_job() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(HandoffGate::new());
    let surface = Arc::new(SimRenderSurface::new(Arc::clone(&gate)));
    let (engine, release) = SlowEngine::new();
    let store = Arc::new(FsMosaicStore::new(dir.path().to_path_buf()));

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let surface_obj: Arc<dyn panorama::backends::render::RenderSurface> = surface.clone();
    let engine_obj: Arc<dyn FrameProcessor> = engine.clone();
    let session = PanoramaSession::new(
        CaptureConfig::default(),
        Box::new(SimCamera::new()),
        surface_obj,
        gate,
        engine_obj,
        store,
        events_tx,
    )
    .unwrap();
    let handle = session.handle();
    tokio::spawn(session.run());

    handle.post(Message::SurfaceReady);
    handle.post(Message::StartCapture);
    handle.post(Message::StopCapture);

    // The preview finalize is now blocked inside the engine. A teardown
    // request must defer, not clear the engine out from under it.
    handle.post(Message::Teardown);
    let ended_early = timeout(Duration::from_millis(300), async {
        loop {
            match events.recv().await {
                Some(UiEvent::SessionEnded) | None => break,
                Some(_) => {}
            }
        }
    })
    .await;
    assert!(
        ended_early.is_err(),
        "session ended while the finalize job was still running"
    );

    release.send(()).unwrap();
    let mut seen = Vec::new();
    timeout(EVENT_WAIT, async {
        loop {
            match events.recv().await {
                Some(UiEvent::SessionEnded) | None => break,
                Some(event) => seen.push(event),
            }
        }
    })
    .await
    .expect("session did not end after the job completed");

    // The job's outcome is discarded during teardown, not surfaced.
    assert!(
        !seen
            .iter()
            .any(|e| matches!(e, UiEvent::FinalizeFailed(_) | UiEvent::ShowFinalMosaic(_))),
        "review events surfaced during teardown"
    );

    // The engine was cleared only after the finalize returned.
    assert_eq!(engine.log(), vec!["finalize_start", "finalize_end", "clear"]);
}

/// Camera advertising nothing: session construction must fail fatally.
struct BrokenCamera;

impl CameraDevice for BrokenCamera {
    fn supported_preview_sizes(&self) -> Vec<PreviewSize> {
        Vec::new()
    }
    fn set_preview_size(&mut self, _size: PreviewSize) -> Result<(), CameraError> {
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
        Ok(())
    }
    fn stop_preview(&mut self) {}
    fn release(&mut self) {}
}

#[tokio::test]
async fn test_setup_failure_is_fatal() {
    let gate = Arc::new(HandoffGate::new());
    let surface = Arc::new(SimRenderSurface::new(Arc::clone(&gate)));
    let processor = Arc::new(SimProcessor::new(160));
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsMosaicStore::new(dir.path().to_path_buf()));
    let (events_tx, _events) = mpsc::unbounded_channel();

    let result = PanoramaSession::new(
        CaptureConfig::default(),
        Box::new(BrokenCamera),
        surface,
        gate,
        processor,
        store,
        events_tx,
    );
    assert!(matches!(
        result,
        Err(PanoramaError::Camera(CameraError::NoPreviewSize))
    ));
}

#[test]
fn test_dispatcher_routes_by_state() {
    let gate = Arc::new(HandoffGate::new());
    let surface = Arc::new(SimRenderSurface::new(Arc::clone(&gate)));
    let processor = Arc::new(SimProcessor::new(160));

    let surface_obj: Arc<dyn panorama::backends::render::RenderSurface> = surface.clone();
    let processor_obj: Arc<dyn FrameProcessor> = processor.clone();
    let mut session = CaptureSession::new();
    let dispatcher = Arc::new(FrameDispatcher::new(
        session.state_cell(),
        surface_obj,
        gate,
        processor_obj,
    ));

    // Idle: nothing happens.
    dispatcher.on_frame_available();
    assert_eq!(harness_counts(&surface, &processor), (0, 0, 0));

    // Viewfinder: render only, no CPU transfer, no engine call.
    session.enter_viewfinder();
    dispatcher.on_frame_available();
    assert_eq!(harness_counts(&surface, &processor), (1, 0, 0));
    assert!(!surface.is_warping());

    // Capturing: warped render, transfer, ingest.
    session.begin_capture();
    dispatcher.on_frame_available();
    assert_eq!(harness_counts(&surface, &processor), (2, 1, 1));
    assert!(surface.is_warping());

    // Detached: ignored entirely.
    dispatcher.set_enabled(false);
    dispatcher.on_frame_available();
    assert_eq!(harness_counts(&surface, &processor), (2, 1, 1));
}

fn harness_counts(surface: &SimRenderSurface, processor: &SimProcessor) -> (u32, u32, u32) {
    (
        surface.preprocessed_frames(),
        surface.transferred_frames(),
        processor.frames_ingested(),
    )
}
