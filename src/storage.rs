// SPDX-License-Identifier: GPL-3.0-only

//! Persistence collaborator for finished panoramas
//!
//! Saving and thumbnailing run on the background job thread, so plain
//! blocking filesystem calls are fine here.

use crate::errors::StorageError;
use chrono::{DateTime, Local};
use image::DynamicImage;
use image::imageops::FilterType;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, info};

/// Handle to a persisted panorama.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle(pub PathBuf);

/// Downsampled preview of a saved panorama, for the gallery affordance.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub handle: ImageHandle,
}

/// Storage operations the save job needs.
pub trait MosaicStore: Send + Sync {
    /// Persist the encoded panorama; names it after the capture time.
    fn save(
        &self,
        jpeg: &[u8],
        taken_at: SystemTime,
        orientation: i32,
    ) -> Result<ImageHandle, StorageError>;

    /// Derive a thumbnail from the encoded bytes. `sample_size` is a
    /// power-of-two downscale hint; `orientation` is applied as rotation.
    fn make_thumbnail(
        &self,
        jpeg: &[u8],
        orientation: i32,
        sample_size: u32,
        handle: &ImageHandle,
    ) -> Result<Thumbnail, StorageError>;
}

/// Filesystem-backed store.
#[derive(Debug, Clone)]
pub struct FsMosaicStore {
    dir: PathBuf,
}

impl FsMosaicStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `IMG_yyyymmdd_hhmmss.jpg` under the configured directory.
    fn image_path(&self, taken_at: SystemTime) -> PathBuf {
        let stamp = DateTime::<Local>::from(taken_at).format("%Y%m%d_%H%M%S");
        self.dir.join(format!("IMG_{stamp}.jpg"))
    }
}

/// Default directory for saved panoramas.
pub fn default_photo_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("panorama")
}

impl MosaicStore for FsMosaicStore {
    fn save(
        &self,
        jpeg: &[u8],
        taken_at: SystemTime,
        orientation: i32,
    ) -> Result<ImageHandle, StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.image_path(taken_at);
        std::fs::write(&path, jpeg)?;
        info!(path = %path.display(), orientation, "Panorama saved");
        Ok(ImageHandle(path))
    }

    fn make_thumbnail(
        &self,
        jpeg: &[u8],
        orientation: i32,
        sample_size: u32,
        handle: &ImageHandle,
    ) -> Result<Thumbnail, StorageError> {
        let img = image::load_from_memory(jpeg)
            .map_err(|e| StorageError::Thumbnail(e.to_string()))?;

        let sample = sample_size.max(1);
        let (w, h) = (
            (img.width() / sample).max(1),
            (img.height() / sample).max(1),
        );
        let small = img.resize(w, h, FilterType::Triangle);

        let rotated: DynamicImage = match orientation {
            90 => small.rotate90(),
            180 => small.rotate180(),
            270 => small.rotate270(),
            _ => small,
        };

        let rgba = rotated.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        debug!(width, height, sample, "Thumbnail derived");

        Ok(Thumbnail {
            rgba: rgba.into_raw(),
            width,
            height,
            handle: handle.clone(),
        })
    }
}
