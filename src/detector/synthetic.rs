//! Synthetic landmark detector
//!
//! Produces a procedural face that orbits the frame center, with optional
//! simulated inference latency. Lets the full pipeline run without a model
//! or camera.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::capture::Frame;
use crate::config::DetectorConfig;
use crate::detector::LandmarkDetector;
use crate::error::Result;
use crate::mesh::{FaceLandmarks, Keypoint};

/// Procedural detector: one face laid out as a hub keypoint plus a ring,
/// matching `Topology::fan`.
pub struct SyntheticDetector {
    keypoints: usize,
    latency: Duration,
    calls: AtomicU64,
}

impl SyntheticDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self::with_shape(
            config.synthetic_keypoints,
            Duration::from_millis(config.synthetic_latency_ms),
        )
    }

    pub fn with_shape(keypoints: usize, latency: Duration) -> Self {
        Self {
            keypoints: keypoints.max(3),
            latency,
            calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl LandmarkDetector for SyntheticDetector {
    async fn estimate(&self, frame: Frame) -> Result<Vec<FaceLandmarks>> {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }

        // Slow circular drift, like a face shifting in front of the camera.
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let t = call as f32 * 0.05;
        let (w, h) = (frame.width as f32, frame.height as f32);
        let cx = w / 2.0 + t.cos() * w * 0.1;
        let cy = h / 2.0 + t.sin() * h * 0.1;
        let radius = w.min(h) * 0.25;

        let ring = self.keypoints - 1;
        let mut keypoints = Vec::with_capacity(self.keypoints);
        keypoints.push(Keypoint::new(cx, cy, 0.0));
        for i in 0..ring {
            let a = i as f32 / ring as f32 * std::f32::consts::TAU;
            keypoints.push(Keypoint::new(
                cx + a.cos() * radius,
                cy + a.sin() * radius,
                a.sin() * 0.05,
            ));
        }

        Ok(vec![FaceLandmarks::new(keypoints)])
    }
}
