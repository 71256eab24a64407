//! Mesh rendering and the fixed-rate overlay painter
//!
//! `MeshRenderer` paints one prediction set; `OverlayPainter` is the task
//! that applies the most recent delivery on the next refresh tick, so
//! painting never happens inside the inference completion itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, MissedTickBehavior};

use crate::mesh::topology::Topology;
use crate::mesh::FaceLandmarks;
use crate::surface::{DrawingSurface, SharedSurface};
use crate::{AppState, MeshUpdate};

/// Paints keypoint markers and wireframe edges for a prediction set.
pub struct MeshRenderer {
    topology: Topology,
}

impl MeshRenderer {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    /// Clear the surface, then draw every face: a marker per keypoint and a
    /// closed outline for every topology triple whose indices are in range.
    ///
    /// An empty set leaves the surface cleared, so a face leaving the frame
    /// never leaves a stale mesh behind. Out-of-range triples are skipped
    /// per-triangle, never fatal.
    pub fn paint(&self, surface: &mut dyn DrawingSurface, faces: &[FaceLandmarks]) {
        surface.clear();

        for face in faces {
            for keypoint in &face.keypoints {
                surface.draw_point(keypoint.x, keypoint.y);
            }

            let mut skipped = 0usize;
            for triple in self.topology.triples() {
                let [a, b, c] = *triple;
                let (Some(ka), Some(kb), Some(kc)) = (
                    face.keypoints.get(a),
                    face.keypoints.get(b),
                    face.keypoints.get(c),
                ) else {
                    skipped += 1;
                    continue;
                };
                surface.draw_line(ka.x, ka.y, kb.x, kb.y);
                surface.draw_line(kb.x, kb.y, kc.x, kc.y);
                surface.draw_line(kc.x, kc.y, ka.x, ka.y);
            }

            if skipped > 0 {
                tracing::warn!(
                    skipped,
                    keypoints = face.keypoints.len(),
                    "Topology references keypoints the detector did not return"
                );
            }
        }
    }
}

/// Fixed-rate paint task.
///
/// Deliveries replace a pending slot; each pending set is painted exactly
/// once, on the next refresh tick.
pub struct OverlayPainter {
    state: Arc<AppState>,
    surface: SharedSurface,
    renderer: MeshRenderer,
    refresh_hz: u32,
    dump_dir: Option<PathBuf>,
}

impl OverlayPainter {
    pub fn new(
        state: Arc<AppState>,
        surface: SharedSurface,
        renderer: MeshRenderer,
        refresh_hz: u32,
    ) -> Self {
        Self {
            state,
            surface,
            renderer,
            refresh_hz: refresh_hz.max(1),
            dump_dir: None,
        }
    }

    /// Write a PNG of the surface after each paint (surfaces that support
    /// snapshots only).
    pub fn with_dump_dir(mut self, dump_dir: Option<PathBuf>) -> Self {
        self.dump_dir = dump_dir;
        self
    }

    /// Run until shutdown.
    pub async fn run(self) {
        let mut mesh_rx = self.state.subscribe_mesh();
        let mut shutdown_rx = self.state.subscribe_shutdown();

        let period = Duration::from_secs_f64(1.0 / f64::from(self.refresh_hz));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut pending: Option<MeshUpdate> = None;

        loop {
            tokio::select! {
                result = mesh_rx.recv() => match result {
                    Ok(update) => pending = Some(update),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::trace!(missed, "Painter lagged behind deliveries");
                    }
                    Err(RecvError::Closed) => return,
                },
                _ = ticker.tick(), if pending.is_some() => {
                    if let Some(update) = pending.take() {
                        self.paint(update).await;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Overlay painter shutting down");
                    return;
                }
            }
        }
    }

    async fn paint(&self, update: MeshUpdate) {
        let mut surface = self.surface.lock().await;
        self.renderer.paint(surface.as_mut(), &update.faces);
        self.state.note_frame_painted();
        tracing::trace!(
            seq = update.seq,
            faces = update.faces.len(),
            "Overlay painted"
        );

        if let Some(dir) = &self.dump_dir {
            if let Some(png) = surface.snapshot_png() {
                let path = dir.join(format!("overlay-{:06}.png", update.seq));
                if let Err(e) = tokio::fs::write(&path, png).await {
                    tracing::warn!("Failed to write overlay dump {}: {}", path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Keypoint;
    use crate::surface::testing::RecordingSurface;
    use crate::surface::SurfaceOp;

    fn face(points: &[(f32, f32)]) -> FaceLandmarks {
        FaceLandmarks::new(
            points
                .iter()
                .map(|&(x, y)| Keypoint::new(x, y, 0.0))
                .collect(),
        )
    }

    #[test]
    fn test_single_triangle_outline() {
        let renderer = MeshRenderer::new(Topology::from_triples(vec![[0, 1, 2]]).unwrap());
        let mut surface = RecordingSurface::new();

        renderer.paint(
            &mut surface,
            &[face(&[(10.0, 10.0), (20.0, 10.0), (10.0, 20.0)])],
        );

        assert_eq!(
            surface.ops(),
            vec![
                SurfaceOp::Clear,
                SurfaceOp::Point(10, 10),
                SurfaceOp::Point(20, 10),
                SurfaceOp::Point(10, 20),
                SurfaceOp::Line(10, 10, 20, 10),
                SurfaceOp::Line(20, 10, 10, 20),
                SurfaceOp::Line(10, 20, 10, 10),
            ]
        );
    }

    #[test]
    fn test_empty_set_clears() {
        let renderer = MeshRenderer::new(Topology::from_triples(vec![[0, 1, 2]]).unwrap());
        let mut surface = RecordingSurface::new();

        renderer.paint(&mut surface, &[face(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)])]);
        renderer.paint(&mut surface, &[]);

        assert!(surface.since_last_clear().is_empty());
    }

    #[test]
    fn test_out_of_range_triple_skipped() {
        let renderer =
            MeshRenderer::new(Topology::from_triples(vec![[0, 1, 2], [0, 1, 99]]).unwrap());
        let mut surface = RecordingSurface::new();

        renderer.paint(
            &mut surface,
            &[face(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)])],
        );

        let lines = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::Line(..)))
            .count();
        assert_eq!(lines, 3);
    }

    #[test]
    fn test_short_face_draws_markers_only() {
        let renderer = MeshRenderer::new(Topology::from_triples(vec![[0, 1, 2]]).unwrap());
        let mut surface = RecordingSurface::new();

        renderer.paint(&mut surface, &[face(&[(5.0, 5.0)])]);

        assert_eq!(
            surface.ops(),
            vec![SurfaceOp::Clear, SurfaceOp::Point(5, 5)]
        );
    }

    #[test]
    fn test_multiple_faces_all_drawn() {
        let renderer = MeshRenderer::new(Topology::from_triples(vec![[0, 1, 2]]).unwrap());
        let mut surface = RecordingSurface::new();

        let a = face(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        let b = face(&[(10.0, 10.0), (11.0, 10.0), (10.0, 11.0)]);
        renderer.paint(&mut surface, &[a, b]);

        let lines = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::Line(..)))
            .count();
        assert_eq!(lines, 6);
    }
}
