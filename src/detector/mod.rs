//! Landmark detectors
//!
//! Detector backends producing per-face landmark sets:
//! - synthetic procedural detector (no model, for demos and tests)
//! - piped helper subprocess (JSON-lines over stdin/stdout)

pub mod piped;
pub mod synthetic;

use std::sync::Arc;

use async_trait::async_trait;

use crate::capture::Frame;
use crate::config::{DetectorConfig, DetectorKind};
use crate::error::Result;
use crate::mesh::FaceLandmarks;

/// Asynchronous facial landmark estimator.
///
/// Latency is unbounded by the caller; the scheduler's at-most-one-in-flight
/// rule is the only backpressure. An empty result means no face was found.
#[async_trait]
pub trait LandmarkDetector: Send + Sync {
    /// Estimate landmarks for every face visible in `frame`.
    async fn estimate(&self, frame: Frame) -> Result<Vec<FaceLandmarks>>;
}

/// Shared detector handle, cloned into each in-flight call.
pub type DetectorHandle = Arc<dyn LandmarkDetector>;

/// Build a detector from configuration.
///
/// `kind = "auto"` picks the piped helper when its script and interpreter
/// are both present, falling back to the synthetic detector.
pub async fn load(config: &DetectorConfig) -> Result<DetectorHandle> {
    match config.kind {
        DetectorKind::Synthetic => Ok(Arc::new(synthetic::SyntheticDetector::new(config))),
        DetectorKind::Piped => Ok(Arc::new(piped::PipedDetector::spawn(config).await?)),
        DetectorKind::Auto => {
            if piped::helper_available(config) {
                tracing::info!("Landmark helper available, using piped detector");
                Ok(Arc::new(piped::PipedDetector::spawn(config).await?))
            } else {
                tracing::info!("No landmark helper available, using synthetic detector");
                Ok(Arc::new(synthetic::SyntheticDetector::new(config)))
            }
        }
    }
}
