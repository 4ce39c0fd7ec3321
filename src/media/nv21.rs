// SPDX-License-Identifier: GPL-3.0-only

//! CPU NV21 to RGB conversion for mosaic re-encoding
//!
//! NV21 is 4:2:0 semi-planar with the chroma plane interleaved VU. The
//! stitching engine emits its final mosaic in this layout; conversion runs
//! once per finalize, on the job thread, so a cache-friendly CPU path is
//! sufficient.

use image::RgbImage;

/// Convert a tightly-packed NV21 buffer to an RGB image.
///
/// `data` must hold at least `width*height` luma bytes followed by
/// `ceil(w/2)*ceil(h/2)*2` interleaved VU bytes; callers validate the length
/// against the decoded dimensions before getting here.
pub fn nv21_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage, String> {
    let width = width as usize;
    let height = height as usize;
    let y_size = width * height;

    let y_plane = &data[..y_size];
    let vu_plane = &data[y_size..];
    let vu_stride = width.div_ceil(2) * 2;

    let mut rgb_data = vec![0u8; width * height * 3];

    // Two luma rows share one chroma row.
    for y_idx in (0..height).step_by(2) {
        let vu_row = y_idx / 2;

        process_row(y_plane, vu_plane, &mut rgb_data, y_idx, vu_row, width, vu_stride);
        if y_idx + 1 < height {
            process_row(y_plane, vu_plane, &mut rgb_data, y_idx + 1, vu_row, width, vu_stride);
        }
    }

    RgbImage::from_raw(width as u32, height as u32, rgb_data)
        .ok_or_else(|| "Failed to create RGB image from buffer".to_string())
}

#[inline]
fn process_row(
    y_plane: &[u8],
    vu_plane: &[u8],
    rgb_data: &mut [u8],
    y_idx: usize,
    vu_row: usize,
    width: usize,
    vu_stride: usize,
) {
    let y_row_start = y_idx * width;
    let vu_row_start = vu_row * vu_stride;
    let rgb_row_start = y_idx * width * 3;

    // Process pixels in pairs; each pair shares one VU sample.
    for x_idx in (0..width).step_by(2) {
        let y_offset = y_row_start + x_idx;
        let vu_offset = vu_row_start + (x_idx / 2) * 2;

        // NV21 interleaves V first, then U.
        let v = vu_plane[vu_offset] as i32 - 128;
        let u = vu_plane[vu_offset + 1] as i32 - 128;

        let r_v = (179 * v) >> 7;
        let g_u = (44 * u) >> 7;
        let g_v = (91 * v) >> 7;
        let b_u = (227 * u) >> 7;

        let y1 = ((y_plane[y_offset] as i32 - 16) * 149) >> 7;
        let rgb_offset = rgb_row_start + x_idx * 3;
        rgb_data[rgb_offset] = (y1 + r_v).clamp(0, 255) as u8;
        rgb_data[rgb_offset + 1] = (y1 - g_u - g_v).clamp(0, 255) as u8;
        rgb_data[rgb_offset + 2] = (y1 + b_u).clamp(0, 255) as u8;

        if x_idx + 1 < width {
            let y2 = ((y_plane[y_offset + 1] as i32 - 16) * 149) >> 7;
            let rgb_offset2 = rgb_row_start + (x_idx + 1) * 3;
            rgb_data[rgb_offset2] = (y2 + r_v).clamp(0, 255) as u8;
            rgb_data[rgb_offset2 + 1] = (y2 - g_u - g_v).clamp(0, 255) as u8;
            rgb_data[rgb_offset2 + 2] = (y2 + b_u).clamp(0, 255) as u8;
        }
    }
}
