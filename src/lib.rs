// SPDX-License-Identifier: GPL-3.0-only

//! Panorama capture orchestration
//!
//! This library coordinates a sweeping panorama capture: routing camera
//! frames between a GPU render surface and a stitching engine, tracking
//! panning from the orientation sensors, and turning the engine's finished
//! mosaic into a saved JPEG.
//!
//! # Architecture
//!
//! - [`session`]: The orchestrator, its state machine, frame dispatcher,
//!   panning monitor, and background job runner
//! - [`backends`]: Contracts for the camera, render surface, and sensor feed
//! - [`pipelines`]: Mosaic buffer codec, finalizer, and the stitching engine
//!   contract
//! - [`media`]: NV21 color conversion and EXIF orientation parsing
//! - [`storage`]: Saving finished panoramas and deriving thumbnails
//! - [`simulator`]: In-process collaborators for running the pipeline
//!   without hardware

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;
pub mod session;
pub mod simulator;
pub mod storage;

// Re-export commonly used types
pub use config::CaptureConfig;
pub use errors::{PanoResult, PanoramaError};
pub use pipelines::mosaic::{FinalMosaic, FrameProcessor, ProgressSnapshot};
pub use session::{Message, PanoramaSession, SessionHandle, UiEvent};
