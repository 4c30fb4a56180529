//! Top-down compositing of block columns into map pixels.
//!
//! A column is the stack of blocks sharing one X/Z position, visited from
//! the highest block down. Each of its 16x16 pixels takes the color of the
//! first opaque node seen from above. With alpha rendering, translucent
//! nodes are blended into a per-pixel scratch color until it turns opaque.

use std::collections::BTreeSet;

use voxmap_core::constants::BLOCK_SIZE;
use voxmap_core::{BlockPos, Color, HeightRange};
use voxmap_persist::BlockDecoder;

use crate::attributes::PixelAttributes;
use crate::canvas::Canvas;
use crate::colors::ColorMap;
use crate::layout::MapLayout;
use crate::mask::CompletionMask;

/// Facts collected over a whole render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Node names that had no entry in the color table.
    pub unknown_nodes: BTreeSet<String>,
    /// Whether any pixel got its color from a node.
    pub rendered_any: bool,
}

/// Blend `top` over `below`.
pub fn mix_colors(top: Color, below: Color) -> Color {
    let a1 = top.a as f64 / 255.0;
    let a2 = below.a as f64 / 255.0;
    let channel = |c1: u8, c2: u8| (a1 * c1 as f64 + a2 * (1.0 - a1) * c2 as f64).round() as u8;
    Color::rgba(
        channel(top.r, below.r),
        channel(top.g, below.g),
        channel(top.b, below.b),
        (255.0 * (a1 + a2 * (1.0 - a1))).round() as u8,
    )
}

/// Per-column compositing state.
pub struct Compositor<'a> {
    colors: &'a ColorMap,
    draw_alpha: bool,
    background: Color,
    heights: HeightRange,
    /// Pixels whose final color is drawn.
    resolved: CompletionMask,
    /// Pixels whose height is recorded.
    height_known: CompletionMask,
    scratch: [[Color; 16]; 16],
    thickness: [[u8; 16]; 16],
}

impl<'a> Compositor<'a> {
    pub fn new(colors: &'a ColorMap, draw_alpha: bool, background: Color, heights: HeightRange) -> Self {
        Self {
            colors,
            draw_alpha,
            background,
            heights,
            resolved: CompletionMask::default(),
            height_known: CompletionMask::default(),
            scratch: [[background.with_alpha(0); 16]; 16],
            thickness: [[0; 16]; 16],
        }
    }

    /// Reset masks and scratch before a new column.
    pub fn begin_column(&mut self) {
        self.resolved.reset();
        self.height_known.reset();
        // Alpha 0 keeps the background out of blends while still giving
        // unresolved pixels a color to draw.
        self.scratch = [[self.background.with_alpha(0); 16]; 16];
        self.thickness = [[0; 16]; 16];
    }

    /// Every pixel of the column has its final color.
    pub fn column_complete(&self) -> bool {
        self.resolved.full()
    }

    /// Any pixel of the column saw a colored node.
    pub fn any_height_known(&self) -> bool {
        self.height_known.any()
    }

    /// Composite one decoded block into the image.
    pub fn render_block(
        &mut self,
        block: &BlockDecoder,
        pos: BlockPos,
        layout: &MapLayout,
        canvas: &mut Canvas,
        attrs: &mut PixelAttributes,
        stats: &mut RenderStats,
    ) {
        let x_begin = (pos.x as i32 - layout.x_min) * BLOCK_SIZE;
        let z_begin = (layout.z_max - pos.z as i32) * BLOCK_SIZE;
        let base_y = pos.y as i32 * BLOCK_SIZE;
        let min_y = (self.heights.min - base_y).max(0);
        let max_y = (self.heights.max - base_y).min(BLOCK_SIZE - 1);

        for z in 0..16usize {
            let image_y = z_begin + 15 - z as i32;
            for x in 0..16usize {
                if self.resolved.get(x, z) {
                    continue;
                }
                let image_x = x_begin + x as i32;
                let attr_row = 15 - z as i32;

                for y in (min_y..=max_y).rev() {
                    let Some(name) = block.get_node(x as u8, y as u8, z as u8) else {
                        continue;
                    };
                    let Some(entry) = self.colors.get(name) else {
                        if !stats.unknown_nodes.contains(name) {
                            stats.unknown_nodes.insert(name.to_string());
                        }
                        continue;
                    };
                    let mut color = entry.color();
                    if color.a == 0 {
                        continue;
                    }

                    // Heights come from the first visible node, translucent
                    // ones included, so water surfaces shade too.
                    if !self.height_known.get(x, z) {
                        attrs.get_mut(attr_row, image_x).height = base_y + y;
                        self.height_known.set(x, z);
                    }

                    if self.draw_alpha {
                        let scratch = self.scratch[z][x];
                        if scratch.a != 0 {
                            color = mix_colors(scratch, color);
                        }
                        if color.a < 255 {
                            self.scratch[z][x] = color;
                            self.thickness[z][x] =
                                ((self.thickness[z][x] as u16 + entry.t as u16) / 2) as u8;
                            continue;
                        }
                        layout.set_zoomed(canvas, image_x, image_y, color);
                        attrs.get_mut(attr_row, image_x).thickness = self.thickness[z][x];
                    } else {
                        layout.set_zoomed(canvas, image_x, image_y, color.with_alpha(255));
                    }
                    self.resolved.set(x, z);
                    break;
                }
            }
        }
    }

    /// Draw pixels no opaque node covered with their blended scratch color.
    /// Only alpha rendering leaves such pixels behind.
    pub fn render_bottom(
        &mut self,
        pos: BlockPos,
        layout: &MapLayout,
        canvas: &mut Canvas,
        attrs: &mut PixelAttributes,
    ) {
        if !self.draw_alpha {
            return;
        }
        let x_begin = (pos.x as i32 - layout.x_min) * BLOCK_SIZE;
        let z_begin = (layout.z_max - pos.z as i32) * BLOCK_SIZE;
        for z in 0..16usize {
            let image_y = z_begin + 15 - z as i32;
            for x in 0..16usize {
                if self.resolved.get(x, z) {
                    continue;
                }
                let image_x = x_begin + x as i32;
                layout.set_zoomed(canvas, image_x, image_y, self.scratch[z][x]);
                self.resolved.set(x, z);
                attrs.get_mut(15 - z as i32, image_x).thickness = self.thickness[z][x];
            }
        }
    }
}
