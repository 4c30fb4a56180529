use std::str::FromStr;

use crate::constants::{BLOCK_AXIS_MAX, BLOCK_AXIS_MIN, BLOCK_SIZE, DEFAULT_MAX_Y, DEFAULT_MIN_Y};
use crate::error::CoreError;

/// Requested X/Z region in block units, half-open: `x1 <= x < x2`, `z1 <= z < z2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x1: i16,
    pub z1: i16,
    pub x2: i16,
    pub z2: i16,
}

impl Default for Geometry {
    /// The whole addressable world.
    fn default() -> Self {
        Self {
            x1: BLOCK_AXIS_MIN,
            z1: BLOCK_AXIS_MIN,
            x2: BLOCK_AXIS_MAX,
            z2: BLOCK_AXIS_MAX,
        }
    }
}

impl Geometry {
    /// Build from a node-unit rectangle. Edges are rounded away from zero to
    /// block boundaries, so the result always covers the requested area,
    /// then clamped to the addressable world.
    pub fn from_nodes(x: i32, z: i32, w: i32, h: i32) -> Self {
        let to_block = |n: i64| {
            let blocks = round_multiple_nosign(n, BLOCK_SIZE as i64) / BLOCK_SIZE as i64;
            blocks.clamp(BLOCK_AXIS_MIN as i64, BLOCK_AXIS_MAX as i64) as i16
        };
        let (x, z) = (x as i64, z as i64);
        Self {
            x1: to_block(x),
            z1: to_block(z),
            x2: to_block(x + w as i64),
            z2: to_block(z + h as i64),
        }
    }

    /// Whether the X extent was narrowed from the whole world.
    pub fn bounded_x(&self) -> bool {
        self.x1 > BLOCK_AXIS_MIN && self.x2 < BLOCK_AXIS_MAX
    }

    /// Whether the Z extent was narrowed from the whole world.
    pub fn bounded_z(&self) -> bool {
        self.z1 > BLOCK_AXIS_MIN && self.z2 < BLOCK_AXIS_MAX
    }

    pub fn width(&self) -> usize {
        (self.x2 as i32 - self.x1 as i32).max(0) as usize
    }

    pub fn depth(&self) -> usize {
        (self.z2 as i32 - self.z1 as i32).max(0) as usize
    }
}

/// Parses `x:y+w+h` in node units, `y` being the world Z coordinate.
impl FromStr for Geometry {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidGeometry(s.to_string());
        let (x, rest) = s.split_once(':').ok_or_else(invalid)?;
        let x: i32 = x.trim().parse().map_err(|_| invalid())?;

        let fields = split_signed(rest.trim());
        let [z, w, h] = fields.as_slice() else {
            return Err(invalid());
        };
        let parse = |field: &str| field.parse::<i32>().map_err(|_| invalid());
        let (z, w, h) = (parse(z)?, parse(w)?, parse(h)?);
        if w < 1 || h < 1 {
            return Err(invalid());
        }
        let geometry = Self::from_nodes(x, z, w, h);
        // Rectangles entirely outside the world clamp to nothing.
        if geometry.x1 >= geometry.x2 || geometry.z1 >= geometry.z2 {
            return Err(invalid());
        }
        Ok(geometry)
    }
}

/// Split `-10+20+30` into `["-10", "+20", "+30"]`.
fn split_signed(s: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if i > start && (c == '+' || c == '-') {
            fields.push(&s[start..i]);
            start = i;
        }
    }
    if start < s.len() {
        fields.push(&s[start..]);
    }
    fields
}

/// Round `n` away from zero to a multiple of `f`, keeping the sign of `n`.
/// Node coordinates arrive as `i32`; working in `i64` leaves room for the
/// rounding step on the extremes.
pub fn round_multiple_nosign(n: i64, f: i64) -> i64 {
    let abs_n = n.abs();
    if abs_n % f == 0 {
        return n;
    }
    n.signum() * (abs_n + f - abs_n % f)
}

/// Requested height range in node units, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightRange {
    pub min: i32,
    pub max: i32,
}

impl Default for HeightRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_Y,
            max: DEFAULT_MAX_Y,
        }
    }
}

impl HeightRange {
    /// Build a range, swapping the bounds if they are inverted.
    pub fn new(min: i32, max: i32) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Lowest block Y containing any requested node.
    pub fn block_min(&self) -> i16 {
        clamp_i16(self.min.div_euclid(BLOCK_SIZE))
    }

    /// One past the highest block Y containing any requested node.
    pub fn block_max(&self) -> i16 {
        clamp_i16(self.max.div_euclid(BLOCK_SIZE) + 1)
    }

    /// Height of the range in blocks as used by the traversal heuristic:
    /// `ceil(max / 16) - floor(min / 16)`.
    pub fn block_span(&self) -> usize {
        let ceil_max = -(-self.max).div_euclid(BLOCK_SIZE);
        let floor_min = self.min.div_euclid(BLOCK_SIZE);
        (ceil_max - floor_min).max(0) as usize
    }
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
