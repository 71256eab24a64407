//! Overlay session lifecycle
//!
//! A session exclusively owns the capture source, the scheduler/painter task
//! handles and the drawing surface; teardown releases all three exactly
//! once. `Active` is the only phase in which ticks fire and paints occur.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::capture::CaptureSource;
use crate::detector::{self, DetectorHandle};
use crate::error::{Result, SessionError};
use crate::mesh::topology::Topology;
use crate::render::{MeshRenderer, OverlayPainter};
use crate::scheduler::InferenceScheduler;
use crate::surface::SharedSurface;
use crate::AppState;

/// Session lifecycle phases. `TornDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Active,
    TornDown,
}

impl SessionPhase {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Active => "active",
            Self::TornDown => "torn-down",
        }
    }
}

pub struct Session {
    state: Arc<AppState>,
    surface: SharedSurface,
    phase: SessionPhase,
    scheduler: Option<JoinHandle<()>>,
    painter: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(state: Arc<AppState>, surface: SharedSurface) -> Self {
        Self {
            state,
            surface,
            phase: SessionPhase::Idle,
            scheduler: None,
            painter: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Build the detector from configuration, then go `Active`.
    pub async fn start(
        &mut self,
        capture: Box<dyn CaptureSource>,
        topology: Topology,
    ) -> Result<()> {
        self.begin_loading()?;

        let detector_config = self.state.config.read().await.detector.clone();
        let detector = match detector::load(&detector_config).await {
            Ok(detector) => detector,
            Err(e) => {
                self.phase = SessionPhase::Idle;
                return Err(e);
            }
        };

        self.activate(capture, detector, topology).await;
        Ok(())
    }

    /// Go `Active` with an already-built detector (tests, embedding hosts).
    pub async fn start_with(
        &mut self,
        capture: Box<dyn CaptureSource>,
        detector: DetectorHandle,
        topology: Topology,
    ) -> Result<()> {
        self.begin_loading()?;
        self.activate(capture, detector, topology).await;
        Ok(())
    }

    fn begin_loading(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::InvalidTransition {
                from: self.phase.name().to_string(),
                to: SessionPhase::Loading.name().to_string(),
            }
            .into());
        }
        self.phase = SessionPhase::Loading;
        Ok(())
    }

    async fn activate(
        &mut self,
        capture: Box<dyn CaptureSource>,
        detector: DetectorHandle,
        topology: Topology,
    ) {
        let config = self.state.config.read().await.clone();

        let painter = OverlayPainter::new(
            Arc::clone(&self.state),
            Arc::clone(&self.surface),
            MeshRenderer::new(topology),
            config.overlay.refresh_hz,
        )
        .with_dump_dir(config.overlay.dump_dir.clone());

        let scheduler = InferenceScheduler::new(
            Arc::clone(&self.state),
            capture,
            detector,
            Arc::clone(&self.surface),
            Duration::from_millis(config.schedule.interval_ms),
        );

        self.painter = Some(tokio::spawn(painter.run()));
        self.scheduler = Some(tokio::spawn(scheduler.run()));
        self.phase = SessionPhase::Active;

        tracing::info!(
            interval_ms = config.schedule.interval_ms,
            refresh_hz = config.overlay.refresh_hz,
            "Overlay session active"
        );
    }

    /// Stop the trigger, discard any in-flight inference and release the
    /// collaborators. Idempotent; safe against in-flight async work.
    pub async fn teardown(&mut self) {
        if self.phase == SessionPhase::TornDown {
            return;
        }

        self.state.shutdown();
        if let Some(handle) = self.scheduler.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.painter.take() {
            let _ = handle.await;
        }
        self.phase = SessionPhase::TornDown;
        tracing::info!("Overlay session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::capture::Frame;
    use crate::config::Config;
    use crate::detector::LandmarkDetector;
    use crate::error::Result as MeshcamResult;
    use crate::geometry::FrameGeometry;
    use crate::mesh::{FaceLandmarks, Keypoint};
    use crate::surface::testing::RecordingSurface;
    use crate::surface::{shared, SurfaceOp};

    struct StaticCapture;

    impl CaptureSource for StaticCapture {
        fn ready(&mut self) -> bool {
            true
        }

        fn geometry(&self) -> FrameGeometry {
            FrameGeometry::new(640, 480)
        }

        fn frame(&mut self) -> Frame {
            Frame::new(640, 480, Vec::new())
        }
    }

    struct SlowDetector {
        latency: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LandmarkDetector for SlowDetector {
        async fn estimate(&self, _frame: Frame) -> MeshcamResult<Vec<FaceLandmarks>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            Ok(vec![FaceLandmarks::new(vec![
                Keypoint::new(10.0, 10.0, 0.0),
                Keypoint::new(20.0, 10.0, 0.0),
                Keypoint::new(10.0, 20.0, 0.0),
            ])])
        }
    }

    fn session_under_test() -> (Session, RecordingSurface, Arc<AppState>) {
        let state = AppState::new(Config::default());
        let surface = RecordingSurface::new();
        let session = Session::new(Arc::clone(&state), shared(surface.clone()));
        (session, surface, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_phases() {
        let (mut session, _surface, _state) = session_under_test();
        assert_eq!(session.phase(), SessionPhase::Idle);

        let detector = Arc::new(SlowDetector {
            latency: Duration::from_millis(5),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        session
            .start_with(
                Box::new(StaticCapture),
                detector,
                Topology::from_triples(vec![[0, 1, 2]]).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);

        session.teardown().await;
        assert_eq!(session.phase(), SessionPhase::TornDown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_rejected() {
        let (mut session, _surface, _state) = session_under_test();
        let detector = || {
            Arc::new(SlowDetector {
                latency: Duration::from_millis(5),
                calls: Arc::new(AtomicUsize::new(0)),
            })
        };
        let topology = Topology::from_triples(vec![[0, 1, 2]]).unwrap();

        session
            .start_with(Box::new(StaticCapture), detector(), topology.clone())
            .await
            .unwrap();
        let again = session
            .start_with(Box::new(StaticCapture), detector(), topology)
            .await;
        assert!(again.is_err());

        session.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_idempotent() {
        let (mut session, _surface, _state) = session_under_test();
        session.teardown().await;
        assert_eq!(session.phase(), SessionPhase::TornDown);
        // A second teardown is a no-op.
        session.teardown().await;
        assert_eq!(session.phase(), SessionPhase::TornDown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_paints_and_stops() {
        let (mut session, surface, state) = session_under_test();
        let detector = Arc::new(SlowDetector {
            latency: Duration::from_millis(5),
            calls: Arc::new(AtomicUsize::new(0)),
        });

        session
            .start_with(
                Box::new(StaticCapture),
                detector,
                Topology::from_triples(vec![[0, 1, 2]]).unwrap(),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        session.teardown().await;

        assert!(state.frames_painted() > 0);
        let painted_ops = surface.ops().len();
        assert!(painted_ops > 0);

        // Nothing further is painted after teardown.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(surface.ops().len(), painted_ops);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_with_pending_call_draws_nothing() {
        let (mut session, surface, _state) = session_under_test();
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = Arc::new(SlowDetector {
            latency: Duration::from_secs(3600),
            calls: Arc::clone(&calls),
        });

        session
            .start_with(
                Box::new(StaticCapture),
                detector,
                Topology::from_triples(vec![[0, 1, 2]]).unwrap(),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        session.teardown().await;

        let draws = surface
            .ops()
            .into_iter()
            .filter(|op| !matches!(op, SurfaceOp::Resize(..)))
            .count();
        assert_eq!(draws, 0);
    }
}
