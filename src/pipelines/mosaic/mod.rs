// SPDX-License-Identifier: GPL-3.0-only

//! Mosaic buffer handling
//!
//! The stitching engine returns the finished panorama as a raw byte buffer
//! with a dimension trailer (see [`codec`]). [`finalizer`] converts that into
//! a displayable or persistable JPEG; [`processor`] is the engine's call
//! contract.

pub mod codec;
pub mod finalizer;
pub mod processor;

pub use codec::MosaicImage;
pub use finalizer::FinalMosaic;
pub use processor::{FrameProcessor, ProgressListener, ProgressSnapshot};
