//! Relief shading from recorded node heights.
//!
//! A pixel higher than its west and north neighbours is brightened, a lower
//! one darkened. Thick translucent surfaces flatten the effect.

use crate::attributes::PixelAttributes;
use crate::canvas::Canvas;
use crate::layout::MapLayout;

/// Brightest a pixel can be lifted by shading.
pub const MAX_HIGHLIGHT: i32 = 36;

const SLOPE_FACTOR: i32 = 12;

/// Brightness change for a pixel at height `h` with west neighbour `west`
/// and north neighbour `north`.
pub fn shade_delta(h: i32, west: i32, north: i32, thickness: u8, draw_alpha: bool) -> i32 {
    let mut d = ((h - west) + (h - north)) * SLOPE_FACTOR;
    if draw_alpha {
        let t = (thickness as f32 * 1.2).min(255.0);
        d = (d as f32 * ((255.0 - t) / 255.0)) as i32;
    }
    d.min(MAX_HIGHLIGHT)
}

/// Shade the block row whose top image row is `z_begin`, then scroll the
/// attribute buffer for the next block row.
pub fn shade_row(
    z_begin: i32,
    layout: &MapLayout,
    canvas: &mut Canvas,
    attrs: &mut PixelAttributes,
    draw_alpha: bool,
) {
    for z in 0..16 {
        let image_y = z_begin + z;
        if image_y >= layout.map_height {
            continue;
        }
        for x in 0..layout.map_width {
            let here = attrs.get(z, x);
            let west = attrs.get(z, x - 1);
            let north = attrs.get(z - 1, x);
            if !(here.valid_height() && west.valid_height() && north.valid_height()) {
                continue;
            }
            let d = shade_delta(here.height, west.height, north.height, here.thickness, draw_alpha);
            if d == 0 {
                continue;
            }
            let mut color = canvas.pixel(layout.image_x(x), layout.image_y(image_y));
            let adjust = |c: u8| (c as i32 + d).clamp(0, 255) as u8;
            color.r = adjust(color.r);
            color.g = adjust(color.g);
            color.b = adjust(color.b);
            layout.set_zoomed(canvas, x, image_y, color);
        }
    }
    attrs.scroll();
}
