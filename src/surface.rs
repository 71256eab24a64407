//! Drawing surfaces
//!
//! The overlay surface the renderer paints on. Coordinates are in the same
//! pixel space as the capture source, so landmark positions map onto the
//! surface without scaling.

use std::sync::Arc;

use glam::Vec2;
use image::{Rgba, RgbaImage};
use tokio::sync::Mutex;

use crate::config::OverlayConfig;

/// A 2D overlay surface.
///
/// Implementations decide marker size and colors; callers only position
/// marks. All drawing is clipped to the current dimensions.
pub trait DrawingSurface: Send {
    /// Current pixel dimensions.
    fn dimensions(&self) -> (u32, u32);

    /// Resize to new pixel dimensions, clearing any prior content.
    fn resize(&mut self, width: u32, height: u32);

    /// Reset all prior content.
    fn clear(&mut self);

    /// Draw a small keypoint marker centered on `(x, y)`.
    fn draw_point(&mut self, x: f32, y: f32);

    /// Draw a straight edge from `(x1, y1)` to `(x2, y2)`.
    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32);

    /// PNG-encode the current content, for surfaces that can.
    fn snapshot_png(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Surface handle shared between the scheduler (resizes) and the painter
/// (draws).
pub type SharedSurface = Arc<Mutex<Box<dyn DrawingSurface>>>;

/// Wrap a surface for shared use.
pub fn shared(surface: impl DrawingSurface + 'static) -> SharedSurface {
    Arc::new(Mutex::new(Box::new(surface)))
}

/// Marker and edge styling for the raster surface.
#[derive(Debug, Clone)]
pub struct SurfaceStyle {
    pub point_color: Rgba<u8>,
    pub line_color: Rgba<u8>,
    /// Marker square size in pixels.
    pub dot_size: u32,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            point_color: Rgba([0, 255, 255, 255]),
            line_color: Rgba([128, 128, 128, 255]),
            dot_size: 2,
        }
    }
}

impl SurfaceStyle {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            point_color: parse_hex(&config.point_color_hex),
            line_color: parse_hex(&config.line_color_hex),
            dot_size: config.dot_size.max(1),
        }
    }
}

/// Parse a `#RRGGBB` color, falling back to opaque aqua.
pub fn parse_hex(hex: &str) -> Rgba<u8> {
    if hex.len() == 7 && hex.starts_with('#') {
        let r = u8::from_str_radix(&hex[1..3], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[3..5], 16).unwrap_or(255);
        let b = u8::from_str_radix(&hex[5..7], 16).unwrap_or(255);
        Rgba([r, g, b, 255])
    } else {
        Rgba([0, 255, 255, 255])
    }
}

/// RGBA pixel-buffer surface.
///
/// Cleared pixels are fully transparent so the overlay composites on top of
/// the video frame.
pub struct RasterSurface {
    image: RgbaImage,
    style: SurfaceStyle,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, style: SurfaceStyle) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            style,
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(0, 0, SurfaceStyle::from_config(config))
    }

    /// Pixel accessor, clipped reads return transparent.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        if x < self.image.width() && y < self.image.height() {
            *self.image.get_pixel(x, y)
        } else {
            Rgba([0, 0, 0, 0])
        }
    }

    fn put(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height()
        {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }
}

impl DrawingSurface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_point(&mut self, x: f32, y: f32) {
        let size = i64::from(self.style.dot_size);
        let color = self.style.point_color;
        let (cx, cy) = (x.round() as i64, y.round() as i64);
        for dy in 0..size {
            for dx in 0..size {
                self.put(cx + dx - size / 2, cy + dy - size / 2, color);
            }
        }
    }

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let from = Vec2::new(x1, y1);
        let to = Vec2::new(x2, y2);
        let steps = (to - from).length().ceil().max(1.0) as u32;
        let color = self.style.line_color;
        for i in 0..=steps {
            let p = from.lerp(to, i as f32 / steps as f32);
            self.put(p.x.round() as i64, p.y.round() as i64, color);
        }
    }

    fn snapshot_png(&self) -> Option<Vec<u8>> {
        use image::ImageEncoder;

        let mut png = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut png);
        encoder
            .write_image(
                self.image.as_raw(),
                self.image.width(),
                self.image.height(),
                image::ExtendedColorType::Rgba8,
            )
            .ok()?;
        Some(png)
    }
}


#[cfg(test)]
pub(crate) use testing::SurfaceOp;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0000"), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_hex("#00FF00"), Rgba([0, 255, 0, 255]));
        assert_eq!(parse_hex("#0000FF"), Rgba([0, 0, 255, 255]));
        assert_eq!(parse_hex("invalid"), Rgba([0, 255, 255, 255]));
    }

    #[test]
    fn test_resize_clears_content() {
        let mut surface = RasterSurface::new(16, 16, SurfaceStyle::default());
        surface.draw_point(8.0, 8.0);
        assert_ne!(surface.pixel(8, 8)[3], 0);

        surface.resize(32, 32);
        assert_eq!(surface.dimensions(), (32, 32));
        assert_eq!(surface.pixel(8, 8)[3], 0);
    }

    #[test]
    fn test_clear_makes_transparent() {
        let mut surface = RasterSurface::new(16, 16, SurfaceStyle::default());
        surface.draw_line(0.0, 0.0, 15.0, 15.0);
        surface.clear();
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(surface.pixel(x, y)[3], 0);
            }
        }
    }

    #[test]
    fn test_line_endpoints_painted() {
        let mut surface = RasterSurface::new(32, 32, SurfaceStyle::default());
        surface.draw_line(2.0, 2.0, 20.0, 10.0);
        assert_eq!(surface.pixel(2, 2), SurfaceStyle::default().line_color);
        assert_eq!(surface.pixel(20, 10), SurfaceStyle::default().line_color);
    }

    #[test]
    fn test_drawing_is_clipped() {
        let mut surface = RasterSurface::new(8, 8, SurfaceStyle::default());
        surface.draw_point(-5.0, -5.0);
        surface.draw_line(-10.0, 4.0, 20.0, 4.0);
        assert_eq!(surface.pixel(0, 4), SurfaceStyle::default().line_color);
    }

    #[test]
    fn test_snapshot_png() {
        let mut surface = RasterSurface::new(8, 8, SurfaceStyle::default());
        surface.draw_point(4.0, 4.0);
        let png = surface.snapshot_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
