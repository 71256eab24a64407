//! Frame geometry tracking
//!
//! The capture source reports intrinsic pixel dimensions that may change
//! between frames (camera renegotiation). `GeometrySync` keeps the drawing
//! surface in lock-step with the last reported value so landmark coordinates
//! map 1:1 onto the overlay without scaling.

use crate::surface::DrawingSurface;

/// Intrinsic (width, height) of the capture source, in pixels.
///
/// Replaced wholesale on every update; never partially mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-sized geometry means the source has not decoded a frame yet.
    pub fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Propagates capture dimensions onto the drawing surface.
///
/// Must run before any prediction set produced under the new dimensions is
/// painted; skipping it misaligns the mesh silently rather than crashing.
#[derive(Debug, Default)]
pub struct GeometrySync {
    applied: Option<FrameGeometry>,
}

impl GeometrySync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize `surface` to `reported` unless it already matches the last
    /// applied geometry. Returns true when a resize was applied.
    pub fn apply(&mut self, surface: &mut dyn DrawingSurface, reported: FrameGeometry) -> bool {
        if self.applied == Some(reported) {
            return false;
        }
        surface.resize(reported.width, reported.height);
        self.applied = Some(reported);
        tracing::debug!(
            width = reported.width,
            height = reported.height,
            "Overlay surface resized"
        );
        true
    }

    /// The geometry most recently applied to the surface, if any.
    pub fn applied(&self) -> Option<FrameGeometry> {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::RecordingSurface;
    use crate::surface::SurfaceOp;

    #[test]
    fn test_apply_resizes_once() {
        let mut surface = RecordingSurface::new();
        let mut sync = GeometrySync::new();

        assert!(sync.apply(&mut surface, FrameGeometry::new(640, 480)));
        assert!(!sync.apply(&mut surface, FrameGeometry::new(640, 480)));

        assert_eq!(surface.ops(), vec![SurfaceOp::Resize(640, 480)]);
        assert_eq!(sync.applied(), Some(FrameGeometry::new(640, 480)));
    }

    #[test]
    fn test_apply_tracks_renegotiation() {
        let mut surface = RecordingSurface::new();
        let mut sync = GeometrySync::new();

        sync.apply(&mut surface, FrameGeometry::new(640, 480));
        assert!(sync.apply(&mut surface, FrameGeometry::new(1280, 720)));

        assert_eq!(
            surface.ops(),
            vec![SurfaceOp::Resize(640, 480), SurfaceOp::Resize(1280, 720)]
        );
        assert_eq!(surface.dimensions(), (1280, 720));
    }

    #[test]
    fn test_zero_geometry() {
        assert!(FrameGeometry::default().is_zero());
        assert!(FrameGeometry::new(640, 0).is_zero());
        assert!(!FrameGeometry::new(640, 480).is_zero());
    }
}
