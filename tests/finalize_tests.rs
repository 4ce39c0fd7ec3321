// SPDX-License-Identifier: GPL-3.0-only

//! Finalize pipeline tests: engine buffer in, JPEG out, with every failure
//! recoverable for another attempt.

use panorama::errors::FinalizeError;
use panorama::pipelines::mosaic::{
    FrameProcessor, MosaicImage, ProgressListener, codec, finalizer,
};
use std::sync::Mutex;

/// Engine stand-in that serves a canned finalize buffer per attempt.
struct CannedEngine {
    buffers: Mutex<Vec<Option<Vec<u8>>>>,
}

impl CannedEngine {
    fn new(buffers: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            buffers: Mutex::new(buffers),
        }
    }
}

impl FrameProcessor for CannedEngine {
    fn initialize(&self, _width: u32, _height: u32) {}
    fn process_frame(&self) {}
    fn update_compass(&self, _x: f32, _y: f32) {}
    fn set_progress_listener(&self, _listener: Option<ProgressListener>) {}
    fn create_mosaic(&self, _high_res: bool) {}
    fn final_mosaic(&self) -> Option<Vec<u8>> {
        let mut buffers = self.buffers.lock().unwrap();
        if buffers.is_empty() {
            None
        } else {
            buffers.remove(0)
        }
    }
    fn report_progress(&self, _high_res: bool) -> i32 {
        100
    }
    fn reset(&self) {}
    fn clear(&self) {}
}

fn valid_buffer(width: i32, height: i32) -> Vec<u8> {
    let payload = vec![0x80u8; MosaicImage::expected_payload_len(width, height)];
    codec::encode(&payload, width, height)
}

#[test]
fn test_finalize_produces_decodable_jpeg() {
    let engine = CannedEngine::new(vec![Some(valid_buffer(320, 48))]);

    let mosaic = finalizer::generate_final_mosaic(&engine, true, 100).unwrap();
    assert_eq!((mosaic.width, mosaic.height), (320, 48));

    let decoded = image::load_from_memory(&mosaic.jpeg).unwrap();
    assert_eq!(decoded.width(), 320);
    assert_eq!(decoded.height(), 48);
}

#[test]
fn test_missing_buffer_is_empty_mosaic() {
    let engine = CannedEngine::new(vec![None]);
    assert!(matches!(
        finalizer::generate_final_mosaic(&engine, false, 100),
        Err(FinalizeError::EmptyMosaic)
    ));
}

#[test]
fn test_failed_attempt_does_not_poison_the_next() {
    // First attempt gets a corrupt trailer, second a valid buffer.
    let engine = CannedEngine::new(vec![
        Some(codec::encode(&[0u8; 16], -4, 48)),
        Some(valid_buffer(64, 48)),
    ]);

    assert!(matches!(
        finalizer::generate_final_mosaic(&engine, false, 100),
        Err(FinalizeError::InvalidDimensions { width: -4, .. })
    ));

    let mosaic = finalizer::generate_final_mosaic(&engine, false, 100).unwrap();
    assert_eq!((mosaic.width, mosaic.height), (64, 48));
}

#[test]
fn test_truncated_buffer_rejected() {
    let engine = CannedEngine::new(vec![Some(vec![0u8; 5])]);
    assert!(matches!(
        finalizer::generate_final_mosaic(&engine, false, 100),
        Err(FinalizeError::Truncated { len: 5 })
    ));
}

#[test]
fn test_payload_shorter_than_trailer_claims_rejected() {
    // Trailer advertises 960x720 but carries a tiny payload.
    let engine = CannedEngine::new(vec![Some(codec::encode(&[0u8; 64], 960, 720))]);
    assert!(matches!(
        finalizer::generate_final_mosaic(&engine, true, 100),
        Err(FinalizeError::PayloadTooShort { .. })
    ));
}
