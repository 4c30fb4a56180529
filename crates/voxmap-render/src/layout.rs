//! Placement of the map on the output image.
//!
//! The map area is `16 * zoom` pixels per block, surrounded by optional
//! 40 pixel borders for scales. World Z grows upwards on the image.

use std::fmt;
use std::str::FromStr;

use voxmap_core::constants::BLOCK_SIZE;
use voxmap_core::{BlockPos, Color, Geometry};

use crate::canvas::Canvas;
use crate::error::RenderError;

/// Pixels reserved for a scale on each enabled side.
pub const SCALE_BORDER: i32 = 40;

/// Images larger than this on either side trigger a warning.
pub const MAX_IMAGE_SIDE: i32 = 4096;

/// Sides of the map that carry a scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scales {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Scales {
    pub const NONE: Self = Self {
        top: false,
        bottom: false,
        left: false,
        right: false,
    };

    /// Used when scales are enabled without naming sides.
    pub const TOP_LEFT: Self = Self {
        top: true,
        bottom: false,
        left: true,
        right: false,
    };
}

/// Parses any combination of `t`, `b`, `l` and `r`.
impl FromStr for Scales {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scales = Self::NONE;
        for c in s.chars() {
            match c {
                't' => scales.top = true,
                'b' => scales.bottom = true,
                'l' => scales.left = true,
                'r' => scales.right = true,
                _ => return Err(RenderError::InvalidScales(s.to_string())),
            }
        }
        Ok(scales)
    }
}

/// Inclusive block extent of the blocks found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockExtent {
    pub x_min: i16,
    pub x_max: i16,
    pub z_min: i16,
    pub z_max: i16,
}

impl BlockExtent {
    pub fn of<'a>(positions: impl IntoIterator<Item = &'a BlockPos>) -> Option<Self> {
        let mut extent: Option<Self> = None;
        for pos in positions {
            extent = Some(match extent {
                None => Self {
                    x_min: pos.x,
                    x_max: pos.x,
                    z_min: pos.z,
                    z_max: pos.z,
                },
                Some(e) => Self {
                    x_min: e.x_min.min(pos.x),
                    x_max: e.x_max.max(pos.x),
                    z_min: e.z_min.min(pos.z),
                    z_max: e.z_max.max(pos.z),
                },
            });
        }
        extent
    }

    /// The whole requested geometry.
    pub fn from_geometry(geometry: &Geometry) -> Self {
        Self {
            x_min: geometry.x1,
            x_max: geometry.x2 - 1,
            z_min: geometry.z1,
            z_max: geometry.z2 - 1,
        }
    }
}

/// Formatted in nodes as a geometry string, `x:z+w+h`.
impl fmt::Display for BlockExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = BLOCK_SIZE;
        write!(
            f,
            "{}:{}+{}+{}",
            self.x_min as i32 * b,
            self.z_min as i32 * b,
            (self.x_max as i32 - self.x_min as i32 + 1) * b,
            (self.z_max as i32 - self.z_min as i32 + 1) * b
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLayout {
    /// Inclusive block bounds of the drawn area.
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
    /// Map size in nodes.
    pub map_width: i32,
    pub map_height: i32,
    pub zoom: i32,
    pub x_border: i32,
    pub y_border: i32,
    pub image_width: i32,
    pub image_height: i32,
}

impl MapLayout {
    /// An axis the geometry narrows is drawn in full so tiles come out the
    /// requested size; other axes are cropped to `content`.
    pub fn new(geometry: &Geometry, content: Option<BlockExtent>, zoom: u32, scales: Scales) -> Self {
        let content = content.unwrap_or(BlockExtent {
            x_min: 0,
            x_max: 0,
            z_min: 0,
            z_max: 0,
        });
        let (x_min, x_max) = if geometry.bounded_x() {
            (geometry.x1 as i32, geometry.x2 as i32 - 1)
        } else {
            (content.x_min as i32, content.x_max as i32)
        };
        let (z_min, z_max) = if geometry.bounded_z() {
            (geometry.z1 as i32, geometry.z2 as i32 - 1)
        } else {
            (content.z_min as i32, content.z_max as i32)
        };

        let zoom = zoom.max(1) as i32;
        let map_width = (x_max - x_min + 1) * BLOCK_SIZE;
        let map_height = (z_max - z_min + 1) * BLOCK_SIZE;
        let border = |enabled: bool| if enabled { SCALE_BORDER } else { 0 };
        let x_border = border(scales.left);
        let y_border = border(scales.top);
        let image_width = map_width * zoom + x_border + border(scales.right);
        let image_height = map_height * zoom + y_border + border(scales.bottom);

        if image_width > MAX_IMAGE_SIDE || image_height > MAX_IMAGE_SIDE {
            log::warn!(
                "The width or height of the image to be created exceeds {MAX_IMAGE_SIDE} pixels! \
                 (Dimensions: {image_width}x{image_height})"
            );
        }

        Self {
            x_min,
            x_max,
            z_min,
            z_max,
            map_width,
            map_height,
            zoom,
            x_border,
            y_border,
            image_width,
            image_height,
        }
    }

    /// Image column of map pixel column `x`.
    pub fn image_x(&self, x: i32) -> i32 {
        self.zoom * x + self.x_border
    }

    /// Image row of map pixel row `y`.
    pub fn image_y(&self, y: i32) -> i32 {
        self.zoom * y + self.y_border
    }

    /// Image column of world node X.
    pub fn world_image_x(&self, world_x: i32) -> i32 {
        self.image_x(world_x - self.x_min * BLOCK_SIZE)
    }

    /// Image row of world node Z. The Z axis is flipped on the image.
    pub fn world_image_y(&self, world_z: i32) -> i32 {
        self.image_y(self.map_height - (world_z - self.z_min * BLOCK_SIZE))
    }

    /// Whether world node coordinates fall inside the drawn block range.
    pub fn contains_node(&self, x: f32, z: f32) -> bool {
        let b = BLOCK_SIZE as f32;
        x >= self.x_min as f32 * b
            && x <= self.x_max as f32 * b
            && z >= self.z_min as f32 * b
            && z <= self.z_max as f32 * b
    }

    /// Paint map pixel `(x, y)` as a `zoom` x `zoom` square.
    pub fn set_zoomed(&self, canvas: &mut Canvas, x: i32, y: i32, color: Color) {
        canvas.fill_rect(self.image_x(x), self.image_y(y), self.zoom, self.zoom, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(x_min: i16, x_max: i16, z_min: i16, z_max: i16) -> BlockExtent {
        BlockExtent {
            x_min,
            x_max,
            z_min,
            z_max,
        }
    }

    #[test]
    fn test_parse_scales() {
        assert_eq!("tl".parse::<Scales>().ok(), Some(Scales::TOP_LEFT));
        let all: Scales = "tblr".parse().expect("should parse");
        assert!(all.top && all.bottom && all.left && all.right);
        assert!("tx".parse::<Scales>().is_err());
    }

    #[test]
    fn test_extent_of_positions() {
        let positions = [
            BlockPos::new(3, 0, -2),
            BlockPos::new(-1, 9, 4),
            BlockPos::new(0, 0, 0),
        ];
        assert_eq!(BlockExtent::of(&positions), Some(extent(-1, 3, -2, 4)));
        assert_eq!(BlockExtent::of(&[]), None);
        assert_eq!(extent(-1, 3, -2, 4).to_string(), "-16:-32+80+112");
    }

    #[test]
    fn test_unbounded_geometry_crops_to_content() {
        let layout = MapLayout::new(
            &Geometry::default(),
            Some(extent(-2, 1, 0, 0)),
            1,
            Scales::NONE,
        );
        assert_eq!((layout.x_min, layout.x_max), (-2, 1));
        assert_eq!(layout.map_width, 64);
        assert_eq!(layout.map_height, 16);
        assert_eq!((layout.image_width, layout.image_height), (64, 16));
    }

    #[test]
    fn test_bounded_geometry_keeps_full_tile() {
        let geometry: Geometry = "-32:-32+64+64".parse().expect("geometry");
        let layout = MapLayout::new(&geometry, Some(extent(0, 0, 0, 0)), 2, Scales::TOP_LEFT);
        assert_eq!((layout.x_min, layout.x_max, layout.z_min, layout.z_max), (-2, 1, -2, 1));
        assert_eq!(layout.map_width, 64);
        assert_eq!(layout.image_width, 64 * 2 + SCALE_BORDER);
        assert_eq!(layout.image_height, 64 * 2 + SCALE_BORDER);
        assert_eq!(layout.image_x(0), SCALE_BORDER);
    }

    #[test]
    fn test_world_to_image_mapping() {
        let layout = MapLayout::new(&Geometry::default(), Some(extent(0, 1, 0, 1)), 1, Scales::NONE);
        // west edge of the map
        assert_eq!(layout.world_image_x(0), 0);
        assert_eq!(layout.world_image_x(31), 31);
        // north edge is the top row, world z = 32 lies just above it
        assert_eq!(layout.world_image_y(32), 0);
        assert_eq!(layout.world_image_y(0), 32);
        assert!(layout.contains_node(16.0, 16.0));
        assert!(!layout.contains_node(-0.5, 0.0));
        assert!(!layout.contains_node(0.0, 17.0));
    }

    #[test]
    fn test_set_zoomed_paints_square() {
        let layout = MapLayout::new(&Geometry::default(), None, 3, Scales::NONE);
        let mut canvas = Canvas::new(
            layout.image_width as u32,
            layout.image_height as u32,
            Color::rgb(0, 0, 0),
        );
        let red = Color::rgb(255, 0, 0);
        layout.set_zoomed(&mut canvas, 1, 1, red);
        assert_eq!(canvas.pixel(3, 3), red);
        assert_eq!(canvas.pixel(5, 5), red);
        assert_eq!(canvas.pixel(6, 6), Color::rgb(0, 0, 0));
        assert_eq!(canvas.pixel(2, 3), Color::rgb(0, 0, 0));
    }
}
