//! Drawing surface backed by an `image::RgbaImage`.
//!
//! Every primitive clips to the image bounds, so callers may pass
//! coordinates that are partly or wholly outside. Pixels are stored opaque.

use std::path::Path;

use image::{Rgba, RgbaImage};
use voxmap_core::Color;

use crate::error::RenderError;
use crate::font::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

pub struct Canvas {
    image: RgbaImage,
}

fn to_rgba(c: Color) -> Rgba<u8> {
    Rgba([c.r, c.g, c.b, 255])
}

impl Canvas {
    /// A `width` x `height` image filled with `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, to_rgba(background)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    fn put(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Color at `(x, y)`; black outside the image.
    pub fn pixel(&self, x: i32, y: i32) -> Color {
        if x < 0 || y < 0 {
            return Color::rgb(0, 0, 0);
        }
        match self.image.get_pixel_checked(x as u32, y as u32) {
            Some(p) => Color::rgba(p[0], p[1], p[2], p[3]),
            None => Color::rgb(0, 0, 0),
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.image.width() as i32);
        let y1 = y.saturating_add(h).min(self.image.height() as i32);
        let rgba = to_rgba(color);
        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px as u32, py as u32, rgba);
            }
        }
    }

    /// Bresenham line including both end points.
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let rgba = to_rgba(color);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        loop {
            self.put(x, y, rgba);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Circle outline of the given radius around `(cx, cy)`.
    pub fn circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color) {
        let rgba = to_rgba(color);
        let (mut x, mut y) = (radius, 0);
        let mut err = 1 - radius;
        while x >= y {
            for (px, py) in [
                (x, y),
                (y, x),
                (-y, x),
                (-x, y),
                (-x, -y),
                (-y, -x),
                (y, -x),
                (x, -y),
            ] {
                self.put(cx + px, cy + py, rgba);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        let rgba = to_rgba(color);
        let mut origin = x;
        for c in text.chars() {
            if let Some(rows) = font::glyph(c) {
                for (row, bits) in (0..GLYPH_HEIGHT).zip(rows.iter()) {
                    for col in 0..GLYPH_WIDTH {
                        if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                            self.put(origin + col, y + row, rgba);
                        }
                    }
                }
            }
            origin += ADVANCE;
        }
    }

    /// Write the image as PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| RenderError::Image {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Color = Color::rgb(255, 255, 255);
    const RED: Color = Color::rgb(255, 0, 0);

    #[test]
    fn test_new_fills_background() {
        let canvas = Canvas::new(4, 3, RED);
        assert_eq!(canvas.width(), 4);
        assert_eq!(canvas.height(), 3);
        assert_eq!(canvas.pixel(3, 2), RED);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = Canvas::new(8, 8, WHITE);
        canvas.fill_rect(-2, 6, 4, 10, RED);
        assert_eq!(canvas.pixel(0, 6), RED);
        assert_eq!(canvas.pixel(1, 7), RED);
        assert_eq!(canvas.pixel(2, 7), WHITE);
        assert_eq!(canvas.pixel(0, 5), WHITE);
    }

    #[test]
    fn test_line_endpoints_and_diagonal() {
        let mut canvas = Canvas::new(10, 10, WHITE);
        canvas.line(0, 0, 5, 5, RED);
        for i in 0..=5 {
            assert_eq!(canvas.pixel(i, i), RED);
        }
        assert_eq!(canvas.pixel(6, 6), WHITE);

        canvas.line(9, 2, 9, -20, RED);
        assert_eq!(canvas.pixel(9, 0), RED);
    }

    #[test]
    fn test_circle_outline() {
        let mut canvas = Canvas::new(30, 30, WHITE);
        canvas.circle(15, 15, 9, RED);
        assert_eq!(canvas.pixel(24, 15), RED);
        assert_eq!(canvas.pixel(6, 15), RED);
        assert_eq!(canvas.pixel(15, 6), RED);
        assert_eq!(canvas.pixel(15, 24), RED);
        assert_eq!(canvas.pixel(15, 15), WHITE);
    }

    #[test]
    fn test_text_draws_glyph_pixels() {
        let mut canvas = Canvas::new(20, 10, WHITE);
        canvas.text(0, 0, "-1", RED);
        // minus is the middle row
        assert_eq!(canvas.pixel(0, 3), RED);
        assert_eq!(canvas.pixel(0, 0), WHITE);
        // top of the "1" stem in the second cell
        assert_eq!(canvas.pixel(ADVANCE + 2, 0), RED);
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("map.png");
        Canvas::new(2, 2, RED).save_png(&path).expect("should save");
        let loaded = image::open(&path).expect("should load").to_rgba8();
        assert_eq!(loaded.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }
}
