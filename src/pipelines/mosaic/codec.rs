// SPDX-License-Identifier: GPL-3.0-only

//! Mosaic trailer codec
//!
//! The stitching engine hands back the finished mosaic as one opaque byte
//! buffer: an NV21 pixel payload followed by an 8-byte trailer carrying the
//! image width and height as big-endian signed 32-bit integers. This module
//! parses and emits that layout byte-for-byte.

use crate::constants::mosaic::TRAILER_LEN;
use crate::errors::FinalizeError;
use tracing::{debug, error};

/// A decoded mosaic: NV21 pixels plus the dimensions from the trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicImage {
    /// NV21 (4:2:0 semi-planar, VU interleaved chroma) pixel data
    pub pixels: Vec<u8>,
    pub width: i32,
    pub height: i32,
}

impl MosaicImage {
    /// Bytes the NV21 layout requires for these dimensions.
    pub fn expected_payload_len(width: i32, height: i32) -> usize {
        let (w, h) = (width as usize, height as usize);
        w * h + w.div_ceil(2) * h.div_ceil(2) * 2
    }
}

/// Read a big-endian signed 32-bit integer the way the trailer defines it:
/// the leading byte is sign-extended, the rest are masked unsigned.
fn read_trailer_i32(bytes: &[u8]) -> i32 {
    (i32::from(bytes[0] as i8) << 24)
        + ((i32::from(bytes[1]) & 0xFF) << 16)
        + ((i32::from(bytes[2]) & 0xFF) << 8)
        + (i32::from(bytes[3]) & 0xFF)
}

/// Decode a finalize buffer into pixels and dimensions.
///
/// Takes ownership of the buffer and truncates the trailer off in place, so
/// the pixel payload is not copied. Fails on a buffer too short to carry the
/// trailer, non-positive dimensions, or a payload shorter than the decoded
/// dimensions require. All failures are per-attempt, never fatal.
pub fn decode(mut buffer: Vec<u8>) -> Result<MosaicImage, FinalizeError> {
    if buffer.len() < TRAILER_LEN {
        error!(len = buffer.len(), "Mosaic buffer shorter than trailer");
        return Err(FinalizeError::Truncated { len: buffer.len() });
    }

    let payload_len = buffer.len() - TRAILER_LEN;
    let trailer = &buffer[payload_len..];
    let width = read_trailer_i32(&trailer[0..4]);
    let height = read_trailer_i32(&trailer[4..8]);
    debug!(payload_len, width, height, "Decoded mosaic trailer");

    if width <= 0 || height <= 0 {
        error!(payload_len, width, height, "Mosaic dimensions non-positive");
        return Err(FinalizeError::InvalidDimensions { width, height });
    }

    let expected = MosaicImage::expected_payload_len(width, height);
    if payload_len < expected {
        error!(
            expected,
            actual = payload_len,
            "Mosaic payload shorter than NV21 layout requires"
        );
        return Err(FinalizeError::PayloadTooShort {
            expected,
            actual: payload_len,
        });
    }

    buffer.truncate(payload_len);
    Ok(MosaicImage {
        pixels: buffer,
        width,
        height,
    })
}

/// Emit a finalize buffer: pixel payload followed by the dimension trailer.
pub fn encode(pixels: &[u8], width: i32, height: i32) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(pixels.len() + TRAILER_LEN);
    buffer.extend_from_slice(pixels);
    buffer.extend_from_slice(&width.to_be_bytes());
    buffer.extend_from_slice(&height.to_be_bytes());
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nv21_payload(width: i32, height: i32) -> Vec<u8> {
        vec![0x80; MosaicImage::expected_payload_len(width, height)]
    }

    #[test]
    fn test_round_trip_recovers_dimensions() {
        for (w, h) in [(2, 2), (64, 48), (960, 720), (4096, 2)] {
            let pixels = nv21_payload(w, h);
            let decoded = decode(encode(&pixels, w, h)).unwrap();
            assert_eq!(decoded.width, w);
            assert_eq!(decoded.height, h);
            assert_eq!(decoded.pixels, pixels);
        }
    }

    #[test]
    fn test_trailer_byte_semantics() {
        // High bit set in a non-leading byte must read unsigned.
        let buffer = encode(&nv21_payload(0x01FF, 2), 0x01FF, 2);
        let decoded = decode(buffer).unwrap();
        assert_eq!(decoded.width, 0x01FF);

        // Leading byte is sign-extended: 0xFF...F6 is -10.
        assert_eq!(read_trailer_i32(&[0xFF, 0xFF, 0xFF, 0xF6]), -10);
        assert_eq!(read_trailer_i32(&[0x00, 0x00, 0x03, 0xC0]), 960);
        assert_eq!(read_trailer_i32(&[0x80, 0x00, 0x00, 0x00]), i32::MIN);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        assert!(matches!(
            decode(vec![0u8; 7]),
            Err(FinalizeError::Truncated { len: 7 })
        ));
    }

    #[test]
    fn test_decode_rejects_zero_width() {
        let buffer = encode(&nv21_payload(2, 2), 0, 720);
        assert!(matches!(
            decode(buffer),
            Err(FinalizeError::InvalidDimensions { width: 0, height: 720 })
        ));
    }

    #[test]
    fn test_decode_rejects_negative_height() {
        let buffer = encode(&nv21_payload(2, 2), 960, -1);
        assert!(matches!(
            decode(buffer),
            Err(FinalizeError::InvalidDimensions {
                width: 960,
                height: -1
            })
        ));
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        // Trailer says 960x720 but there are only 16 payload bytes.
        let buffer = encode(&[0u8; 16], 960, 720);
        assert!(matches!(
            decode(buffer),
            Err(FinalizeError::PayloadTooShort { .. })
        ));
    }
}
