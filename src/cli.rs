// SPDX-License-Identifier: GPL-3.0-only

//! Command implementations for the demo binary
//!
//! Runs a full capture session against the simulated collaborators: preview,
//! sweep, review, save. Useful for exercising the orchestration end to end
//! without camera hardware.

use panorama::backends::handoff::HandoffGate;
use panorama::backends::sensor::{self, SensorKind, SensorSample};
use panorama::config::CaptureConfig;
use panorama::session::panning::PanningMonitor;
use panorama::session::{Message, PanoramaSession, UiEvent};
use panorama::simulator::{SimCamera, SimProcessor, SimRenderSurface};
use panorama::storage::FsMosaicStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Simulated sweep rate in rad/s. Comfortably under the too-fast threshold
/// for a 60 degree field of view.
const SWEEP_RATE: f32 = 0.4;

/// Run one simulated capture from viewfinder to saved panorama. With
/// `skip_save`, stop after the review mosaic instead of persisting.
pub async fn run_capture(
    config: CaptureConfig,
    skip_save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sweep_angle = config.sweep_angle;
    let save_dir = config.save_dir();

    let gate = Arc::new(HandoffGate::new());
    let surface = Arc::new(SimRenderSurface::new(Arc::clone(&gate)));
    let processor = Arc::new(SimProcessor::new(sweep_angle));
    let store = Arc::new(FsMosaicStore::new(save_dir));

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let surface_obj: Arc<dyn panorama::backends::render::RenderSurface> = surface.clone();
    let processor_obj: Arc<dyn panorama::FrameProcessor> = processor.clone();
    let session = PanoramaSession::new(
        config,
        Box::new(SimCamera::new()),
        surface_obj,
        gate,
        processor_obj,
        store,
        events_tx,
    )?;

    let handle = session.handle();
    let dispatcher = session.dispatcher();
    let session_task = tokio::spawn(session.run());

    handle.post(Message::SurfaceReady);
    handle.post(Message::StartCapture);

    // Frame notifications, as the render surface would deliver them, each
    // carrying its own transform.
    let stop = Arc::new(AtomicBool::new(false));
    let frame_thread = {
        let stop = Arc::clone(&stop);
        let surface = Arc::clone(&surface);
        std::thread::spawn(move || {
            let mut frame = 0u32;
            while !stop.load(Ordering::Acquire) {
                let mut transform = panorama::backends::render::IDENTITY_TRANSFORM;
                transform[12] = frame as f32 * 0.01;
                surface.set_transform(transform);
                dispatcher.on_frame_available();
                frame += 1;
                std::thread::sleep(Duration::from_millis(15));
            }
        })
    };

    // Orientation feed sweeping one axis at a steady rate. The simulator
    // has a gyroscope, so that is what drives the panning monitor.
    let sensor_kind = sensor::preferred_kind(true);
    info!(?sensor_kind, "Sensor feed selected");
    let sensor_thread = {
        let processor = Arc::clone(&processor);
        std::thread::spawn(move || {
            let mut monitor = PanningMonitor::new(processor);
            let mut timestamp_ns: u64 = 0;
            loop {
                let sample = match sensor_kind {
                    SensorKind::Gyroscope => SensorSample::AngularVelocity {
                        axis0: 0.0,
                        axis1: SWEEP_RATE,
                        axis2: 0.0,
                        timestamp_ns,
                    },
                    SensorKind::Orientation => SensorSample::Orientation {
                        yaw: timestamp_ns as f32 * 1e-9 * SWEEP_RATE.to_degrees(),
                        pitch: 0.0,
                        roll: 0.0,
                    },
                };
                monitor.ingest(sample);
                let (x, _) = monitor.compass();
                if x as i32 > sweep_angle + 5 {
                    break;
                }
                timestamp_ns += 20_000_000;
                std::thread::sleep(Duration::from_millis(2));
            }
        })
    };

    while let Some(event) = events_rx.recv().await {
        match event {
            UiEvent::CaptureStarted => info!("Capture started, sweep away"),
            UiEvent::CaptureStopped => info!("Capture stopped, rendering preview"),
            UiEvent::TooFastPrompt(raised) => {
                if raised {
                    warn!("Panning too fast");
                }
            }
            UiEvent::SweepProgress(degrees) => info!(degrees, "Sweep progress"),
            UiEvent::JobProgress(progress) => info!(progress, "Saving"),
            UiEvent::ShowFinalMosaic(mosaic) => {
                info!(
                    width = mosaic.width,
                    height = mosaic.height,
                    bytes = mosaic.jpeg.len(),
                    "Preview mosaic ready"
                );
                if skip_save {
                    handle.post(Message::Teardown);
                } else {
                    handle.post(Message::SaveMosaic);
                }
            }
            UiEvent::MosaicSaved { handle: image, thumbnail } => {
                info!(
                    path = %image.0.display(),
                    thumbnail = thumbnail.is_some(),
                    "Panorama saved"
                );
                handle.post(Message::Teardown);
            }
            UiEvent::FinalizeFailed(kind) => {
                warn!(?kind, "Finalize failed");
                handle.post(Message::Teardown);
            }
            UiEvent::ResetToPreview => info!("Back to viewfinder"),
            UiEvent::FatalError(message) => {
                warn!(%message, "Session failed");
                break;
            }
            UiEvent::SessionEnded => break,
        }
    }

    stop.store(true, Ordering::Release);
    frame_thread.join().expect("frame thread");
    sensor_thread.join().expect("sensor thread");
    session_task.await?;
    Ok(())
}

/// Print the effective configuration.
pub fn show_config(config: &CaptureConfig) {
    println!("sweep_angle: {}", config.sweep_angle);
    println!("capture_pixels: {}", config.capture_pixels);
    println!("panning_speed_threshold: {}", config.panning_speed_threshold);
    println!("progress_poll_interval_ms: {}", config.progress_poll_interval_ms);
    println!("jpeg_quality: {}", config.jpeg_quality);
    println!("save_dir: {}", config.save_dir().display());
}
