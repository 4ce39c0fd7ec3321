// SPDX-License-Identifier: GPL-3.0-only

//! Mosaic finalization
//!
//! Turns the stitching engine's completed internal buffer into a standard
//! JPEG: trailer decode, NV21 to RGB conversion, and a full-frame re-encode
//! at maximum quality. Every failure here is recoverable: the finalize
//! attempt fails, the session does not.

use super::codec::{self, MosaicImage};
use super::processor::FrameProcessor;
use crate::errors::FinalizeError;
use crate::media::nv21;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::io::Cursor;
use tracing::{error, info};

/// Finished panorama bytes plus the decoded dimensions.
#[derive(Debug, Clone)]
pub struct FinalMosaic {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Ask the engine to combine all captured frames, then re-encode the result.
///
/// Runs on the background job thread; the caller guarantees no frame
/// ingestion or reset is concurrent with this call.
pub fn generate_final_mosaic(
    processor: &dyn FrameProcessor,
    high_res: bool,
    quality: u8,
) -> Result<FinalMosaic, FinalizeError> {
    processor.create_mosaic(high_res);

    let buffer = processor.final_mosaic().ok_or_else(|| {
        error!("Frame processor returned no final mosaic buffer");
        FinalizeError::EmptyMosaic
    })?;

    let mosaic = codec::decode(buffer)?;
    info!(
        width = mosaic.width,
        height = mosaic.height,
        high_res,
        "Final mosaic decoded"
    );

    let jpeg = encode_jpeg(&mosaic, quality)?;
    Ok(FinalMosaic {
        jpeg,
        width: mosaic.width as u32,
        height: mosaic.height as u32,
    })
}

/// Encode a decoded mosaic as JPEG over its full frame.
pub fn encode_jpeg(mosaic: &MosaicImage, quality: u8) -> Result<Vec<u8>, FinalizeError> {
    // Dimensions were validated positive by the codec.
    let width = mosaic.width as u32;
    let height = mosaic.height as u32;

    let rgb = nv21::nv21_to_rgb(&mosaic.pixels, width, height)
        .map_err(FinalizeError::Encode)?;

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), quality);
    if let Err(e) = encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8) {
        error!(error = %e, "JPEG encoding of final mosaic failed");
        return Err(FinalizeError::Encode(e.to_string()));
    }

    Ok(out)
}
