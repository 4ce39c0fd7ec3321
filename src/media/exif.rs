// SPDX-License-Identifier: GPL-3.0-only

//! Minimal EXIF orientation reader
//!
//! The save job needs only the rotation of a JPEG it is about to persist.
//! This walks the JPEG marker stream to the APP1/TIFF block and reads tag
//! 0x0112. Anything malformed or absent yields 0 degrees.

use tracing::debug;

const ORIENTATION_TAG: u16 = 0x0112;

/// Rotation in degrees (0, 90, 180 or 270) encoded in the JPEG's EXIF
/// metadata, or 0 when none is present.
pub fn orientation(jpeg: &[u8]) -> i32 {
    parse_orientation(jpeg).unwrap_or(0)
}

fn parse_orientation(jpeg: &[u8]) -> Option<i32> {
    // SOI marker
    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return None;
        }
        let marker = jpeg[pos + 1];
        let seg_len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > jpeg.len() {
            return None;
        }

        match marker {
            // APP1 carries the EXIF block
            0xE1 => {
                let segment = &jpeg[pos + 4..pos + 2 + seg_len];
                return tiff_orientation(segment.strip_prefix(b"Exif\0\0")?);
            }
            // Start of scan: no metadata past this point
            0xDA => return None,
            _ => pos += 2 + seg_len,
        }
    }
    None
}

fn tiff_orientation(tiff: &[u8]) -> Option<i32> {
    if tiff.len() < 8 {
        return None;
    }
    let big_endian = match &tiff[0..2] {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };
    let read_u16 = |b: &[u8]| -> u16 {
        if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        }
    };
    let read_u32 = |b: &[u8]| -> u32 {
        if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        }
    };

    if read_u16(&tiff[2..4]) != 0x002A {
        return None;
    }

    let ifd_offset = read_u32(&tiff[4..8]) as usize;
    if ifd_offset + 2 > tiff.len() {
        return None;
    }

    let entry_count = read_u16(&tiff[ifd_offset..ifd_offset + 2]) as usize;
    for i in 0..entry_count {
        let entry = ifd_offset + 2 + i * 12;
        if entry + 12 > tiff.len() {
            return None;
        }
        if read_u16(&tiff[entry..entry + 2]) != ORIENTATION_TAG {
            continue;
        }
        // SHORT values are stored inline in the value field.
        let value = read_u16(&tiff[entry + 8..entry + 10]);
        let degrees = match value {
            1 => 0,
            3 => 180,
            6 => 90,
            8 => 270,
            other => {
                debug!(value = other, "Unsupported EXIF orientation value");
                0
            }
        };
        return Some(degrees);
    }
    None
}
