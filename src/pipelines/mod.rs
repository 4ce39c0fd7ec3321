// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! Heavy per-finalize work lives here, off the coordinating context:
//!
//! - [`mosaic`]: trailer codec, stitching-engine call contract, and the
//!   final JPEG re-encode.

pub mod mosaic;
