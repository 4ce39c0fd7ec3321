// SPDX-License-Identifier: GPL-3.0-only

//! External collaborator contracts
//!
//! The camera hardware, GPU render surface, and sensor feed all live outside
//! this crate. These modules define the interfaces the orchestration layer
//! consumes, plus the handoff gate both sides of the GPU-CPU transfer share.

pub mod camera;
pub mod handoff;
pub mod render;
pub mod sensor;
