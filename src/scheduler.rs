//! Inference scheduler
//!
//! The timing core: couples the fixed-period trigger to the variable-latency
//! detector. At most one inference call is ever in flight; ticks that fire
//! while a call is outstanding are dropped, never queued, so completion
//! order coincides with trigger order and stale frames cannot overwrite
//! fresher results.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::capture::CaptureSource;
use crate::detector::DetectorHandle;
use crate::error::MeshcamError;
use crate::geometry::GeometrySync;
use crate::mesh::FaceLandmarks;
use crate::surface::SharedSurface;
use crate::AppState;

type Inflight = JoinHandle<Result<Vec<FaceLandmarks>, MeshcamError>>;

pub struct InferenceScheduler {
    state: Arc<AppState>,
    capture: Box<dyn CaptureSource>,
    detector: DetectorHandle,
    surface: SharedSurface,
    geometry: GeometrySync,
    period: Duration,
}

impl InferenceScheduler {
    pub fn new(
        state: Arc<AppState>,
        capture: Box<dyn CaptureSource>,
        detector: DetectorHandle,
        surface: SharedSurface,
        period: Duration,
    ) -> Self {
        Self {
            state,
            capture,
            detector,
            surface,
            geometry: GeometrySync::new(),
            period,
        }
    }

    /// Run until shutdown. The in-flight slot is the mutual-exclusion guard:
    /// a single call slot, never a queue.
    pub async fn run(mut self) {
        let mut shutdown_rx = self.state.subscribe_shutdown();
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut inflight: Option<Inflight> = None;

        loop {
            if let Some(mut call) = inflight.take() {
                tokio::select! {
                    result = &mut call => self.complete(result).await,
                    _ = ticker.tick() => {
                        // A call is still outstanding: this tick is a no-op.
                        self.state.note_tick_dropped();
                        inflight = Some(call);
                    }
                    _ = shutdown_rx.recv() => {
                        // The in-flight result must never reach the painter.
                        call.abort();
                        tracing::debug!("Inference scheduler shutting down, in-flight call discarded");
                        return;
                    }
                }
            } else {
                tokio::select! {
                    _ = ticker.tick() => inflight = self.trigger().await,
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Inference scheduler shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Start one detector call, unless the capture source is not ready.
    async fn trigger(&mut self) -> Option<Inflight> {
        if !self.capture.ready() {
            // Expected steady-state during startup and teardown.
            tracing::trace!("Capture source not ready, skipping tick");
            return None;
        }

        let reported = self.capture.geometry();
        if reported.is_zero() {
            tracing::trace!("Capture source reports zero-size frame, skipping tick");
            return None;
        }

        // Geometry propagation precedes the trigger so the first successful
        // inference lands on a correctly-sized surface.
        {
            let mut surface = self.surface.lock().await;
            self.geometry.apply(surface.as_mut(), reported);
        }

        let frame = self.capture.frame();
        let detector = Arc::clone(&self.detector);
        Some(tokio::spawn(async move { detector.estimate(frame).await }))
    }

    /// Handle one completed detector call.
    async fn complete(
        &mut self,
        result: Result<Result<Vec<FaceLandmarks>, MeshcamError>, tokio::task::JoinError>,
    ) {
        match result {
            Ok(Ok(faces)) => {
                // Geometry may have changed while the call was in flight;
                // re-read the current value before delivery.
                let geometry = self.capture.geometry();
                {
                    let mut surface = self.surface.lock().await;
                    self.geometry.apply(surface.as_mut(), geometry);
                }
                self.state.publish_mesh(geometry, faces);
            }
            Ok(Err(e)) => {
                // The next periodic tick is itself the retry.
                self.state.note_detect_failure();
                tracing::error!("Landmark inference failed: {}", e);
            }
            Err(e) => {
                self.state.note_detect_failure();
                tracing::error!("Landmark inference task failed: {}", e);
            }
        }
    }
}
