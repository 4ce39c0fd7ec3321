// SPDX-License-Identifier: GPL-3.0-only

//! Background job runner
//!
//! Finalizing a mosaic blocks for seconds, so it runs on a dedicated thread
//! while the orchestrator keeps servicing messages. At most one job exists at
//! a time; a second request while one is in flight is rejected, never queued.

use crate::errors::JobError;
use crate::pipelines::mosaic::{FinalMosaic, FrameProcessor};
use crate::storage::{ImageHandle, Thumbnail};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, warn};

/// What a finished capture is being turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Low-res render of the swept mosaic for on-screen review.
    FinalizePreview,
    /// High-res render, persisted to storage.
    FinalizeAndSave,
}

/// Saved panorama and its gallery thumbnail, if one could be derived.
#[derive(Debug, Clone)]
pub struct SavedMosaic {
    pub handle: ImageHandle,
    pub thumbnail: Option<Thumbnail>,
}

/// What the worker thread hands back when it finishes.
#[derive(Debug)]
pub enum JobOutcome {
    /// `None` when the stitch produced nothing usable.
    PreviewReady(Option<FinalMosaic>),
    /// `None` when finalizing or persisting failed.
    SaveFinished(Option<SavedMosaic>),
}

/// Single-flight runner for finalize work.
///
/// The `running` flag is shared with the progress poller; the worker clears
/// it just before reporting completion so the poller winds down without
/// being told separately.
pub struct JobRunner {
    running: Arc<AtomicBool>,
    active: Option<JobKind>,
    worker: Option<JoinHandle<()>>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            active: None,
            worker: None,
        }
    }

    pub fn active(&self) -> Option<JobKind> {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Flag the progress poller watches.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Start `job` on a worker thread. `done` runs on that thread after the
    /// running flag clears; the orchestrator's `done` posts the outcome back
    /// onto its own message queue.
    pub fn submit<F, D>(&mut self, kind: JobKind, job: F, done: D) -> Result<(), JobError>
    where
        F: FnOnce() -> JobOutcome + Send + 'static,
        D: FnOnce(JobKind, JobOutcome) + Send + 'static,
    {
        if let Some(active) = self.active {
            warn!(?active, requested = ?kind, "Job rejected: one already in flight");
            return Err(JobError::AlreadyRunning);
        }

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);

        let handle = std::thread::Builder::new()
            .name("panorama-job".into())
            .spawn(move || {
                debug!(?kind, "Background job started");
                let outcome = job();
                running.store(false, Ordering::Release);
                debug!(?kind, "Background job finished");
                done(kind, outcome);
            })
            .map_err(|e| {
                error!("Failed to spawn job thread: {e}");
                self.running.store(false, Ordering::Release);
                JobError::SpawnFailed(e.to_string())
            })?;

        self.active = Some(kind);
        self.worker = Some(handle);
        Ok(())
    }

    /// Clear the in-flight marker once the completion message has been
    /// processed. Until then any new submission is refused.
    pub fn acknowledge(&mut self, kind: JobKind) {
        if self.active != Some(kind) {
            warn!(active = ?self.active, finished = ?kind, "Completion for unexpected job");
        }
        self.active = None;
        if let Some(handle) = self.worker.take() {
            // The worker already ran `done`, so this returns promptly.
            let _ = handle.join();
        }
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll the stitching engine for finalize progress while `running` holds.
///
/// Sleeps first, then checks the flag, so a report is never emitted after
/// the job has already announced completion. A failed spawn loses progress
/// reporting only; the job itself is unaffected, so this logs and returns
/// `None` rather than failing the submission.
pub fn spawn_progress_poller<F>(
    running: Arc<AtomicBool>,
    processor: Arc<dyn FrameProcessor>,
    high_res: bool,
    interval: Duration,
    on_progress: F,
) -> Option<JoinHandle<()>>
where
    F: Fn(i32) + Send + 'static,
{
    let spawned = std::thread::Builder::new()
        .name("panorama-progress".into())
        .spawn(move || {
            loop {
                std::thread::sleep(interval);
                if !running.load(Ordering::Acquire) {
                    break;
                }
                on_progress(processor.report_progress(high_res));
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to spawn progress poller: {e}");
            None
        }
    }
}
