//! Capture sources
//!
//! Live video input as seen by the scheduler. The hosting side updates a
//! capture source continuously; the core only reads readiness, the current
//! frame and its intrinsic dimensions.

use std::sync::Arc;

use crate::config::CaptureConfig;
use crate::geometry::FrameGeometry;

/// One RGB video frame.
///
/// Pixel data is shared so handing a frame to the detector is cheap.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGB8, row-major.
    pub rgb: Arc<[u8]>,
}

impl Frame {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgb: rgb.into(),
        }
    }
}

/// A live video source.
///
/// `ready` and `geometry` may change between calls; a frame pulled while the
/// source reports not-ready has unspecified content, so callers must gate on
/// `ready` first.
pub trait CaptureSource: Send {
    /// Whether a decoded frame of non-zero size is available.
    fn ready(&mut self) -> bool;

    /// Intrinsic pixel dimensions; may change between frames.
    fn geometry(&self) -> FrameGeometry;

    /// The current frame.
    fn frame(&mut self) -> Frame;
}

/// Procedural capture source: a moving gradient, no camera hardware needed.
///
/// Reports not-ready for the first `warmup_polls` readiness checks to mimic
/// camera startup.
pub struct SyntheticCapture {
    geometry: FrameGeometry,
    warmup_polls: u64,
    polls: u64,
    ticks: u64,
}

impl SyntheticCapture {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            geometry: FrameGeometry::new(config.width, config.height),
            warmup_polls: u64::from(config.warmup_polls),
            polls: 0,
            ticks: 0,
        }
    }
}

impl CaptureSource for SyntheticCapture {
    fn ready(&mut self) -> bool {
        self.polls += 1;
        self.polls > self.warmup_polls
    }

    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn frame(&mut self) -> Frame {
        self.ticks += 1;
        let (w, h) = (self.geometry.width, self.geometry.height);
        let phase = (self.ticks * 3 % 255) as u32;
        let mut rgb = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                rgb.push((x * 255 / w.max(1)) as u8);
                rgb.push((y * 255 / h.max(1)) as u8);
                rgb.push(((x + y + phase) % 255) as u8);
            }
        }
        Frame::new(w, h, rgb)
    }
}
