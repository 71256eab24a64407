//! meshcam - Live facial-landmark wireframe overlay
//!
//! A headless service that overlays a live wireframe mesh of detected facial
//! landmarks on a webcam feed:
//! - couples a fixed-period inference trigger to a variable-latency detector
//!   with an at-most-one-in-flight guard
//! - paints keypoints and a triangulated wireframe at a fixed refresh cadence
//! - keeps the overlay surface in lock-step with the capture source's
//!   intrinsic geometry

pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod surface;

pub use config::Config;
pub use error::{MeshcamError, Result};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use geometry::FrameGeometry;
use mesh::FaceLandmarks;

/// One completed inference delivery: the prediction set plus the frame
/// geometry current at completion time.
#[derive(Debug, Clone)]
pub struct MeshUpdate {
    pub seq: u64,
    pub geometry: FrameGeometry,
    pub faces: Vec<FaceLandmarks>,
}

/// Application state shared across all components
#[derive(Debug)]
pub struct AppState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Channel for completed inference deliveries
    mesh_tx: broadcast::Sender<MeshUpdate>,
    /// Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// Delivery sequence counter
    seq: AtomicU64,
    /// Overlay frames painted so far
    frames_painted: AtomicU64,
    /// Trigger ticks dropped while a call was in flight
    ticks_dropped: AtomicU64,
    /// Detector failures observed
    detect_failures: AtomicU64,
}

impl AppState {
    /// Create a new application state with the given configuration
    pub fn new(config: Config) -> Arc<Self> {
        let (mesh_tx, _) = broadcast::channel(16);
        let (shutdown_tx, _) = broadcast::channel(1);

        Arc::new(Self {
            config: RwLock::new(config),
            mesh_tx,
            shutdown_tx,
            seq: AtomicU64::new(0),
            frames_painted: AtomicU64::new(0),
            ticks_dropped: AtomicU64::new(0),
            detect_failures: AtomicU64::new(0),
        })
    }

    /// Publish one completed inference delivery. Returns its sequence number.
    pub fn publish_mesh(&self, geometry: FrameGeometry, faces: Vec<FaceLandmarks>) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.mesh_tx.send(MeshUpdate {
            seq,
            geometry,
            faces,
        });
        seq
    }

    /// Subscribe to inference deliveries
    pub fn subscribe_mesh(&self) -> broadcast::Receiver<MeshUpdate> {
        self.mesh_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn note_frame_painted(&self) -> u64 {
        self.frames_painted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn frames_painted(&self) -> u64 {
        self.frames_painted.load(Ordering::Relaxed)
    }

    pub fn note_tick_dropped(&self) {
        self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks_dropped(&self) -> u64 {
        self.ticks_dropped.load(Ordering::Relaxed)
    }

    pub fn note_detect_failure(&self) {
        self.detect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detect_failures(&self) -> u64 {
        self.detect_failures.load(Ordering::Relaxed)
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
