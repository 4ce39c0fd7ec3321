// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use std::time::Duration;

/// Total horizontal sweep the capture session advertises, in degrees.
pub const DEFAULT_SWEEP_ANGLE: i32 = 160;

/// Target capture resolution in pixels (960x720, 4:3).
pub const DEFAULT_CAPTURE_PIXELS: u32 = 960 * 720;

/// Panning speed above which the "too fast" prompt is raised, in deg/sec.
pub const PANNING_SPEED_THRESHOLD: f32 = 30.0;

/// Nanoseconds to seconds, for gyroscope timestamp deltas.
pub const NS_TO_S: f32 = 1.0 / 1_000_000_000.0;

/// Mosaic buffer layout constants
pub mod mosaic {
    /// Trailing bytes of a finalize buffer: width and height as two
    /// big-endian signed 32-bit integers.
    pub const TRAILER_LEN: usize = 8;

    /// Final mosaics are re-encoded at maximum JPEG quality.
    pub const JPEG_QUALITY: u8 = 100;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Interval between stitching-progress polls while a finalize job runs.
    pub const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(50);
}

/// Thumbnail constants
pub mod thumbnail {
    /// Thumbnails are downsampled until their height fits this.
    pub const TARGET_EDGE: u32 = 480;
}

/// Smallest power of two greater than or equal to `n` (minimum 1).
///
/// Turns a thumbnail scale ratio into a decoder sample-size hint.
pub fn next_power_of_two(n: u32) -> u32 {
    n.max(1).next_power_of_two()
}
