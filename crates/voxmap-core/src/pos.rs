//! Block positions and the legacy packed position key.
//!
//! Stores that address blocks by a single integer use
//! `key = z * 2^24 + y * 2^12 + x`, computed with plain signed arithmetic.
//! Negative components borrow from the next axis, so decoding has to peel
//! the axes off one at a time with a modulo that never goes negative.
//! Existing worlds depend on this exact layout.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::constants::{AXIS_SPAN, KEY_Y_STRIDE, KEY_Z_STRIDE};
use crate::error::CoreError;

/// Position of a map block in block units (one unit = 16 nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl BlockPos {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }
}

/// Traversal order is descending on every axis: z first, then y, then x.
/// Sorting a column therefore puts the highest block first.
impl Ord for BlockPos {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .z
            .cmp(&self.z)
            .then_with(|| other.y.cmp(&self.y))
            .then_with(|| other.x.cmp(&self.x))
    }
}

impl PartialOrd for BlockPos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Parses `x,y,z` in block units.
impl FromStr for BlockPos {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidBlockPos(s.to_string());
        let mut parts = s.split(',').map(|p| p.trim().parse::<i16>());
        let (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(Self::new(x, y, z))
    }
}

/// Pack a block position into its 64-bit storage key.
pub fn encode_block_pos(pos: BlockPos) -> i64 {
    pos.z as i64 * KEY_Z_STRIDE + pos.y as i64 * KEY_Y_STRIDE + pos.x as i64
}

/// Unpack a storage key into a block position. Inverse of [`encode_block_pos`].
pub fn decode_block_pos(key: i64) -> BlockPos {
    let x = unsigned_to_signed(floor_mod(key, AXIS_SPAN));
    let key = (key - x as i64) / AXIS_SPAN;
    let y = unsigned_to_signed(floor_mod(key, AXIS_SPAN));
    let key = (key - y as i64) / AXIS_SPAN;
    let z = unsigned_to_signed(floor_mod(key, AXIS_SPAN));
    BlockPos::new(x, y, z)
}

/// Modulo whose result is always in `[0, modulus)`, also for negative dividends.
fn floor_mod(value: i64, modulus: i64) -> i64 {
    value.rem_euclid(modulus)
}

/// Map a 12-bit field in `[0, 4096)` back to `[-2048, 2048)`.
fn unsigned_to_signed(field: i64) -> i16 {
    let half = AXIS_SPAN / 2;
    if field < half {
        field as i16
    } else {
        (field - AXIS_SPAN) as i16
    }
}
