// SPDX-License-Identifier: GPL-3.0-only

//! Render surface contract
//!
//! The GPU texture pipeline (warping, preview rendering) is an external
//! collaborator. The orchestration layer drives it through this trait and
//! synchronizes frame handoffs through [`HandoffGate`](super::handoff::HandoffGate).

/// Column-major 4x4 texture transform, as delivered by the frame source.
pub type TransformMatrix = [f32; 16];

/// Identity transform, used before the first frame arrives.
pub const IDENTITY_TRANSFORM: TransformMatrix = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Operations the capture pipeline invokes on the render surface.
///
/// Called from the frame dispatcher, which may run on any thread the
/// platform delivers frame notifications on; implementations forward GPU
/// work to their own render context.
pub trait RenderSurface: Send + Sync {
    /// Enable or disable warped rendering for the capture path.
    fn set_warping(&self, enabled: bool);

    /// Render the latest frame to the internal low- and high-res textures,
    /// using the transform that belongs to that frame.
    fn preprocess(&self, transform: &TransformMatrix);

    /// Start copying the preprocessed textures into CPU memory. The
    /// implementation signals its handoff gate from the render context once
    /// the copy lands.
    fn transfer_to_cpu(&self);

    /// Transform matrix of the frame that triggered the current
    /// notification. Fetched before any other per-frame work so the capture
    /// path never pairs a frame with a stale transform.
    fn transform_matrix(&self) -> TransformMatrix;
}
