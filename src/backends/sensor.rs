// SPDX-License-Identifier: GPL-3.0-only

//! Orientation sensor feed types
//!
//! The platform delivers one of two sample kinds per session. Angular
//! velocity is preferred; absolute orientation is the fallback when no
//! gyroscope is present.

/// Which sensor the session is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Gyroscope,
    Orientation,
}

/// Pick the sensor to drive panning with. The gyroscope integrates more
/// smoothly, so it wins whenever the platform has one.
pub fn preferred_kind(has_gyroscope: bool) -> SensorKind {
    if has_gyroscope {
        SensorKind::Gyroscope
    } else {
        SensorKind::Orientation
    }
}

/// One sensor sample, delivered on the platform's sensor-callback context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorSample {
    /// Angular velocity in rad/s per device axis, with the delivery
    /// timestamp in nanoseconds.
    AngularVelocity {
        axis0: f32,
        axis1: f32,
        axis2: f32,
        timestamp_ns: u64,
    },
    /// Absolute orientation in degrees.
    Orientation { yaw: f32, pitch: f32, roll: f32 },
}
