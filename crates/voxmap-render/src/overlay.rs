//! Decorations drawn on top of the finished map.

use voxmap_core::constants::BLOCK_SIZE;
use voxmap_core::{Color, HeightRange};
use voxmap_world::players::Player;
use voxmap_world::poi::Poi;

use crate::canvas::Canvas;
use crate::layout::{MapLayout, Scales, SCALE_BORDER};

/// Blocks between two scale ticks.
const TICK_BLOCKS: i32 = 4;

/// Tick marks labelled in node coordinates along each enabled border.
pub fn draw_scale(canvas: &mut Canvas, layout: &MapLayout, scales: Scales, color: Color) {
    let map_right = layout.x_border + layout.map_width * layout.zoom;
    let map_bottom = layout.y_border + layout.map_height * layout.zoom;
    let x_ticks = move || {
        x_tick_blocks(layout).map(move |i| (i * BLOCK_SIZE, layout.world_image_x(i * BLOCK_SIZE)))
    };
    let z_ticks = move || {
        z_tick_blocks(layout).map(move |i| (i * BLOCK_SIZE, layout.world_image_y(i * BLOCK_SIZE + 1)))
    };

    if scales.top {
        canvas.text(24, 0, "X", color);
        for (node, x) in x_ticks().filter(|&(_, x)| x >= 0) {
            canvas.text(x + 2, 0, &node.to_string(), color);
            canvas.line(x, 0, x, layout.y_border - 1, color);
        }
    }

    if scales.left {
        canvas.text(2, 24, "Z", color);
        for (node, y) in z_ticks().filter(|&(_, y)| y >= 0) {
            canvas.text(2, y, &node.to_string(), color);
            canvas.line(0, y, layout.x_border - 1, y, color);
        }
    }

    if scales.bottom {
        canvas.text(map_right - 24 - 8, map_bottom + SCALE_BORDER - 12, "X", color);
        for (node, x) in x_ticks().filter(|&(_, x)| x >= 0) {
            canvas.text(x + 2, map_bottom, &node.to_string(), color);
            canvas.line(x, map_bottom, x, map_bottom + SCALE_BORDER - 1, color);
        }
    }

    if scales.right {
        canvas.text(map_right + SCALE_BORDER - 2 - 8, map_bottom - 24 - 12, "Z", color);
        for (node, y) in z_ticks().filter(|&(_, y)| y >= 0) {
            canvas.text(map_right + 2, y, &node.to_string(), color);
            canvas.line(map_right, y, map_right + SCALE_BORDER - 1, y, color);
        }
    }
}

/// Tick positions in blocks, starting at the multiple of four nearest zero.
fn x_tick_blocks(layout: &MapLayout) -> impl Iterator<Item = i32> {
    let start = (layout.x_min / TICK_BLOCKS) * TICK_BLOCKS;
    (start..=layout.x_max).step_by(TICK_BLOCKS as usize)
}

fn z_tick_blocks(layout: &MapLayout) -> impl Iterator<Item = i32> {
    let start = (layout.z_max / TICK_BLOCKS) * TICK_BLOCKS;
    let z_min = layout.z_min;
    (0..)
        .map(move |step| start - step * TICK_BLOCKS)
        .take_while(move |&i| i >= z_min)
}

/// Circle around world position 0,0 when it lies inside the drawn area.
pub fn draw_origin(canvas: &mut Canvas, layout: &MapLayout, color: Color) {
    if layout.x_min > 0 || layout.x_max < 0 || layout.z_min > 0 || layout.z_max < 0 {
        return;
    }
    canvas.circle(layout.world_image_x(0), layout.world_image_y(0), 12, color);
}

fn in_view(layout: &MapLayout, heights: &HeightRange, x: f32, y: f32, z: f32) -> bool {
    layout.contains_node(x, z) && y >= heights.min as f32 && y <= heights.max as f32
}

/// A small cross and the player's name for every player in view.
pub fn draw_players(
    canvas: &mut Canvas,
    layout: &MapLayout,
    heights: &HeightRange,
    players: &[Player],
    color: Color,
) {
    for player in players {
        if !in_view(layout, heights, player.x, player.y, player.z) {
            continue;
        }
        let x = layout.world_image_x(player.x as i32);
        let y = layout.world_image_y(player.z as i32);
        canvas.fill_rect(x - 1, y, 3, 1, color);
        canvas.fill_rect(x, y - 1, 1, 3, color);
        canvas.text(x + 2, y, &player.name, color);
    }
}

/// A ring and label for every point of interest in view.
pub fn draw_pois(canvas: &mut Canvas, layout: &MapLayout, heights: &HeightRange, pois: &[Poi], color: Color) {
    for poi in pois {
        if !in_view(layout, heights, poi.x, poi.y, poi.z) {
            continue;
        }
        let x = layout.world_image_x(poi.x as i32);
        let y = layout.world_image_y(poi.z as i32);
        canvas.circle(x, y, 9, color);
        canvas.text(x + 7, y, &poi.name, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BlockExtent;
    use voxmap_core::Geometry;

    const WHITE: Color = Color::rgb(255, 255, 255);
    const RED: Color = Color::rgb(255, 0, 0);

    fn layout(x_min: i16, x_max: i16, z_min: i16, z_max: i16, scales: Scales) -> MapLayout {
        let extent = BlockExtent {
            x_min,
            x_max,
            z_min,
            z_max,
        };
        MapLayout::new(&Geometry::default(), Some(extent), 1, scales)
    }

    fn canvas_for(layout: &MapLayout) -> Canvas {
        Canvas::new(layout.image_width as u32, layout.image_height as u32, WHITE)
    }

    fn player(name: &str, x: f32, y: f32, z: f32) -> Player {
        Player {
            name: name.to_string(),
            x,
            y,
            z,
        }
    }

    #[test]
    fn test_tick_blocks() {
        let l = layout(-5, 9, -7, 6, Scales::NONE);
        assert_eq!(x_tick_blocks(&l).collect::<Vec<_>>(), vec![-4, 0, 4, 8]);
        assert_eq!(z_tick_blocks(&l).collect::<Vec<_>>(), vec![4, 0, -4]);
    }

    #[test]
    fn test_top_scale_draws_tick_lines() {
        let l = layout(0, 7, 0, 7, Scales::TOP_LEFT);
        let mut canvas = canvas_for(&l);
        draw_scale(&mut canvas, &l, Scales::TOP_LEFT, RED);
        // tick at node 64 is at image column 40 + 64
        assert_eq!(canvas.pixel(104, 30), RED);
        assert_eq!(canvas.pixel(104, 39), RED);
        assert_eq!(canvas.pixel(104, 40), WHITE);
        // the map area stays untouched
        assert_eq!(canvas.pixel(100, 100), WHITE);
    }

    #[test]
    fn test_right_scale_lines_end_at_border() {
        let scales = Scales {
            right: true,
            ..Scales::NONE
        };
        let l = layout(0, 3, 0, 3, scales);
        let mut canvas = canvas_for(&l);
        draw_scale(&mut canvas, &l, scales, RED);
        let y = l.world_image_y(1);
        assert_eq!(canvas.pixel(64, y), RED);
        assert_eq!(canvas.pixel(103, y), RED);
        assert_eq!(canvas.pixel(63, y), WHITE);
    }

    #[test]
    fn test_origin_only_when_visible() {
        let l = layout(-2, 1, -2, 1, Scales::NONE);
        let mut canvas = canvas_for(&l);
        draw_origin(&mut canvas, &l, RED);
        let (cx, cy) = (l.world_image_x(0), l.world_image_y(0));
        assert_eq!(canvas.pixel(cx + 12, cy), RED);
        assert_eq!(canvas.pixel(cx, cy), WHITE);

        let l = layout(2, 5, 2, 5, Scales::NONE);
        let mut canvas = canvas_for(&l);
        draw_origin(&mut canvas, &l, RED);
        assert!(canvas.image().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_players_filtered_by_area_and_height() {
        let l = layout(0, 3, 0, 3, Scales::NONE);
        let heights = HeightRange::new(-10, 50);
        let players = vec![
            player("visible", 20.0, 5.0, 20.0),
            player("outside", 500.0, 5.0, 20.0),
            player("too_high", 40.0, 80.0, 40.0),
        ];
        let mut canvas = canvas_for(&l);
        draw_players(&mut canvas, &l, &heights, &players, RED);

        let (x, y) = (l.world_image_x(20), l.world_image_y(20));
        assert_eq!(canvas.pixel(x, y), RED);
        assert_eq!(canvas.pixel(x - 1, y), RED);
        assert_eq!(canvas.pixel(x, y + 1), RED);
        let (hx, hy) = (l.world_image_x(40), l.world_image_y(40));
        assert_eq!(canvas.pixel(hx, hy), WHITE);
    }

    #[test]
    fn test_poi_draws_ring() {
        let l = layout(0, 3, 0, 3, Scales::NONE);
        let pois = vec![Poi {
            name: "spawn".to_string(),
            x: 30.0,
            y: 0.0,
            z: 30.0,
        }];
        let mut canvas = canvas_for(&l);
        draw_pois(&mut canvas, &l, &HeightRange::default(), &pois, RED);
        let (x, y) = (l.world_image_x(30), l.world_image_y(30));
        assert_eq!(canvas.pixel(x - 9, y), RED);
        assert_eq!(canvas.pixel(x, y), WHITE);
    }
}
