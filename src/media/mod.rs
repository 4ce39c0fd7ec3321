// SPDX-License-Identifier: GPL-3.0-only

//! Media format helpers: pixel layout conversion and metadata parsing

pub mod exif;
pub mod nv21;
