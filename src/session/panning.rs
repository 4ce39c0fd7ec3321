// SPDX-License-Identifier: GPL-3.0-only

//! Panning monitor
//!
//! Integrates the raw orientation feed into a 2-axis compass estimate and
//! pushes it to the stitching engine after every sample. Owned by the
//! sensor-callback context; the engine receives updates through an explicit
//! call, never through shared memory.

use crate::backends::camera::ViewAngles;
use crate::backends::sensor::SensorSample;
use crate::constants::NS_TO_S;
use crate::pipelines::mosaic::FrameProcessor;
use std::f32::consts::PI;
use std::sync::Arc;

pub struct PanningMonitor {
    processor: Arc<dyn FrameProcessor>,
    compass_x: f32,
    compass_y: f32,
    last_timestamp_ns: Option<u64>,
}

impl PanningMonitor {
    pub fn new(processor: Arc<dyn FrameProcessor>) -> Self {
        Self {
            processor,
            compass_x: 0.0,
            compass_y: 0.0,
            last_timestamp_ns: None,
        }
    }

    /// Fold one sensor sample into the compass estimate and publish it.
    ///
    /// Gyroscope samples integrate angular velocity over the time since the
    /// previous sample; the first sample only seeds the timestamp.
    /// Orientation samples are absolute and replace the estimate directly.
    pub fn ingest(&mut self, sample: SensorSample) {
        match sample {
            SensorSample::AngularVelocity {
                axis0,
                axis1,
                timestamp_ns,
                ..
            } => {
                if let Some(prev) = self.last_timestamp_ns {
                    let dt = timestamp_ns.saturating_sub(prev) as f32 * NS_TO_S;
                    self.compass_x += axis1 * dt * 180.0 / PI;
                    self.compass_y += axis0 * dt * 180.0 / PI;
                }
                self.last_timestamp_ns = Some(timestamp_ns);
            }
            SensorSample::Orientation { yaw, pitch, .. } => {
                self.compass_x = yaw;
                self.compass_y = pitch;
            }
        }

        self.processor.update_compass(self.compass_x, self.compass_y);
    }

    /// Current compass estimate in degrees.
    pub fn compass(&self) -> (f32, f32) {
        (self.compass_x, self.compass_y)
    }

    /// Clear the estimate when the stitching engine is reset.
    pub fn reset(&mut self) {
        self.compass_x = 0.0;
        self.compass_y = 0.0;
        self.last_timestamp_ns = None;
    }
}

/// Whether the panning rate exceeds the warning threshold on either axis.
///
/// The rate is scaled by the field of view so the threshold is in the same
/// deg/sec units regardless of lens. Strictly greater: a rate landing exactly
/// on the threshold does not warn. Advisory only; capture is never halted.
pub fn panning_too_fast(
    rate_x: f32,
    rate_y: f32,
    angles: ViewAngles,
    threshold: f32,
) -> bool {
    rate_x * angles.horizontal > threshold || rate_y * angles.vertical > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records compass pushes; all other engine calls are irrelevant here.
    #[derive(Default)]
    struct CompassRecorder {
        updates: Mutex<Vec<(f32, f32)>>,
    }

    impl FrameProcessor for CompassRecorder {
        fn initialize(&self, _width: u32, _height: u32) {}
        fn process_frame(&self) {}
        fn update_compass(&self, x: f32, y: f32) {
            self.updates.lock().unwrap().push((x, y));
        }
        fn set_progress_listener(
            &self,
            _listener: Option<crate::pipelines::mosaic::ProgressListener>,
        ) {
        }
        fn create_mosaic(&self, _high_res: bool) {}
        fn final_mosaic(&self) -> Option<Vec<u8>> {
            None
        }
        fn report_progress(&self, _high_res: bool) -> i32 {
            0
        }
        fn reset(&self) {}
        fn clear(&self) {}
    }

    fn gyro(axis0: f32, axis1: f32, timestamp_ns: u64) -> SensorSample {
        SensorSample::AngularVelocity {
            axis0,
            axis1,
            axis2: 0.0,
            timestamp_ns,
        }
    }

    #[test]
    fn test_one_second_at_pi_rad_per_sec_is_180_degrees() {
        let recorder = Arc::new(CompassRecorder::default());
        let mut monitor = PanningMonitor::new(recorder.clone());

        monitor.ingest(gyro(0.0, 0.0, 0));
        monitor.ingest(gyro(0.0, PI, 1_000_000_000));

        let (x, y) = monitor.compass();
        assert!((x - 180.0).abs() < 1e-3, "compass X was {x}");
        assert_eq!(y, 0.0);

        // One push per sample, including the seeding one.
        assert_eq!(recorder.updates.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_first_sample_only_seeds_timestamp() {
        let mut monitor = PanningMonitor::new(Arc::new(CompassRecorder::default()));
        monitor.ingest(gyro(1.0, 1.0, 5_000_000_000));
        assert_eq!(monitor.compass(), (0.0, 0.0));
    }

    #[test]
    fn test_integration_accumulates_across_samples() {
        let mut monitor = PanningMonitor::new(Arc::new(CompassRecorder::default()));
        monitor.ingest(gyro(0.0, 0.0, 0));
        // Two half-second steps at pi/2 rad/s on axis1: 45 degrees each.
        monitor.ingest(gyro(0.0, PI / 2.0, 500_000_000));
        monitor.ingest(gyro(0.0, PI / 2.0, 1_000_000_000));

        let (x, _) = monitor.compass();
        assert!((x - 90.0).abs() < 1e-3, "compass X was {x}");
    }

    #[test]
    fn test_orientation_samples_are_absolute() {
        let mut monitor = PanningMonitor::new(Arc::new(CompassRecorder::default()));
        monitor.ingest(SensorSample::Orientation {
            yaw: 33.0,
            pitch: -7.5,
            roll: 90.0,
        });
        assert_eq!(monitor.compass(), (33.0, -7.5));
    }

    #[test]
    fn test_reset_clears_estimate_and_timestamp() {
        let mut monitor = PanningMonitor::new(Arc::new(CompassRecorder::default()));
        monitor.ingest(gyro(0.0, 0.0, 0));
        monitor.ingest(gyro(PI, PI, 1_000_000_000));
        monitor.reset();
        assert_eq!(monitor.compass(), (0.0, 0.0));

        // Next sample seeds again instead of integrating a huge dt.
        monitor.ingest(gyro(PI, PI, 9_000_000_000));
        assert_eq!(monitor.compass(), (0.0, 0.0));
    }

    #[test]
    fn test_too_fast_threshold_is_strict() {
        let angles = ViewAngles {
            horizontal: 60.0,
            vertical: 45.0,
        };
        // 0.5 deg/s * 60 = 30.0 exactly: quiet.
        assert!(!panning_too_fast(0.5, 0.0, angles, 30.0));
        assert!(panning_too_fast(0.51, 0.0, angles, 30.0));
        // Either axis alone can trigger.
        assert!(panning_too_fast(0.0, 0.7, angles, 30.0));
        assert!(!panning_too_fast(0.0, 0.0, angles, 30.0));
    }
}
