// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the panorama pipeline

use std::fmt;

/// Result type alias using PanoramaError
pub type PanoResult<T> = Result<T, PanoramaError>;

/// Main pipeline error type
#[derive(Debug, Clone)]
pub enum PanoramaError {
    /// Camera-related errors (fatal, session never becomes active)
    Camera(CameraError),
    /// Mosaic finalization errors (recoverable, per finalize attempt)
    Finalize(FinalizeError),
    /// Background job errors
    Job(JobError),
    /// Storage/filesystem errors
    Storage(StorageError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
///
/// Any of these during setup is fatal: the session stays in `Idle` and the
/// embedder must tear it down.
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Camera hardware could not be acquired
    AcquisitionFailed(String),
    /// Camera access is disabled on this device
    Disabled,
    /// The camera reported no usable preview size
    NoPreviewSize,
    /// Attaching the preview target failed
    PreviewAttachFailed(String),
    /// Starting the live preview failed
    PreviewStartFailed(String),
}

/// Mosaic finalization errors
#[derive(Debug, Clone)]
pub enum FinalizeError {
    /// The frame processor produced no mosaic buffer
    EmptyMosaic,
    /// Buffer too short to carry the dimension trailer
    Truncated { len: usize },
    /// Trailer decoded to non-positive dimensions
    InvalidDimensions { width: i32, height: i32 },
    /// Pixel payload shorter than the decoded dimensions require
    PayloadTooShort { expected: usize, actual: usize },
    /// JPEG encoding of the decoded mosaic failed
    Encode(String),
}

/// Background job errors
#[derive(Debug, Clone)]
pub enum JobError {
    /// A finalize job is already running; jobs are single-flight
    AlreadyRunning,
    /// The worker thread could not be spawned
    SpawnFailed(String),
}

/// Storage errors
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Filesystem I/O failure
    Io(String),
    /// Thumbnail derivation failure
    Thumbnail(String),
}

impl fmt::Display for PanoramaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanoramaError::Camera(e) => write!(f, "Camera error: {}", e),
            PanoramaError::Finalize(e) => write!(f, "Finalize error: {}", e),
            PanoramaError::Job(e) => write!(f, "Job error: {}", e),
            PanoramaError::Storage(e) => write!(f, "Storage error: {}", e),
            PanoramaError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PanoramaError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::AcquisitionFailed(msg) => write!(f, "Cannot connect to camera: {}", msg),
            CameraError::Disabled => write!(f, "Camera is disabled"),
            CameraError::NoPreviewSize => write!(f, "No supported preview size"),
            CameraError::PreviewAttachFailed(msg) => {
                write!(f, "Attaching preview target failed: {}", msg)
            }
            CameraError::PreviewStartFailed(msg) => write!(f, "Starting preview failed: {}", msg),
        }
    }
}

impl fmt::Display for FinalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalizeError::EmptyMosaic => write!(f, "Frame processor returned no mosaic"),
            FinalizeError::Truncated { len } => {
                write!(f, "Mosaic buffer too short for trailer: {} bytes", len)
            }
            FinalizeError::InvalidDimensions { width, height } => {
                write!(f, "Mosaic dimensions invalid: {}x{}", width, height)
            }
            FinalizeError::PayloadTooShort { expected, actual } => {
                write!(
                    f,
                    "Mosaic payload too short: expected {} bytes, got {}",
                    expected, actual
                )
            }
            FinalizeError::Encode(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::AlreadyRunning => write!(f, "A finalize job is already running"),
            JobError::SpawnFailed(msg) => write!(f, "Failed to spawn job thread: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "I/O error: {}", msg),
            StorageError::Thumbnail(msg) => write!(f, "Thumbnail error: {}", msg),
        }
    }
}

impl std::error::Error for PanoramaError {}
impl std::error::Error for CameraError {}
impl std::error::Error for FinalizeError {}
impl std::error::Error for JobError {}
impl std::error::Error for StorageError {}

// Conversions from sub-errors to PanoramaError
impl From<CameraError> for PanoramaError {
    fn from(err: CameraError) -> Self {
        PanoramaError::Camera(err)
    }
}

impl From<FinalizeError> for PanoramaError {
    fn from(err: FinalizeError) -> Self {
        PanoramaError::Finalize(err)
    }
}

impl From<JobError> for PanoramaError {
    fn from(err: JobError) -> Self {
        PanoramaError::Job(err)
    }
}

impl From<StorageError> for PanoramaError {
    fn from(err: StorageError) -> Self {
        PanoramaError::Storage(err)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<std::io::Error> for PanoramaError {
    fn from(err: std::io::Error) -> Self {
        PanoramaError::Storage(StorageError::Io(err.to_string()))
    }
}

impl From<String> for PanoramaError {
    fn from(msg: String) -> Self {
        PanoramaError::Other(msg)
    }
}

impl From<&str> for PanoramaError {
    fn from(msg: &str) -> Self {
        PanoramaError::Other(msg.to_string())
    }
}
