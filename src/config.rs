// SPDX-License-Identifier: GPL-3.0-only

//! Capture configuration
//!
//! JSON on disk, defaults compiled in. Missing file or unreadable contents
//! fall back to defaults; unknown fields are ignored.

use crate::constants;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Horizontal sweep, degrees, before capture auto-stops.
    pub sweep_angle: i32,
    /// Target preview area used when choosing a capture resolution.
    pub capture_pixels: u32,
    /// Panning-rate warning threshold, degrees per second of field of view.
    pub panning_speed_threshold: f32,
    /// Finalize progress poll cadence, milliseconds.
    pub progress_poll_interval_ms: u64,
    /// JPEG quality for the saved panorama.
    pub jpeg_quality: u8,
    /// Where finished panoramas land; `None` means the platform default.
    pub save_dir: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sweep_angle: constants::DEFAULT_SWEEP_ANGLE,
            capture_pixels: constants::DEFAULT_CAPTURE_PIXELS,
            panning_speed_threshold: constants::PANNING_SPEED_THRESHOLD,
            progress_poll_interval_ms: constants::timing::PROGRESS_POLL_INTERVAL.as_millis() as u64,
            jpeg_quality: constants::mosaic::JPEG_QUALITY,
            save_dir: None,
        }
    }
}

impl CaptureConfig {
    /// Resolved save directory.
    pub fn save_dir(&self) -> PathBuf {
        self.save_dir
            .clone()
            .unwrap_or_else(crate::storage::default_photo_directory)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.progress_poll_interval_ms)
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("panorama").join("config.json"))
    }

    /// Load from the platform config directory, defaults on any failure.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), "Invalid configuration, using defaults: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist to the platform config directory.
    pub fn save(&self) -> Result<(), crate::errors::PanoramaError> {
        let path = Self::config_path()
            .ok_or_else(|| crate::errors::PanoramaError::Config("no config directory".into()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::errors::PanoramaError::Config(e.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| crate::errors::PanoramaError::Config(e.to_string()))?;
        std::fs::write(&path, contents)
            .map_err(|e| crate::errors::PanoramaError::Config(e.to_string()))?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}
