//! Shared constants for the map block format and the position hash.

/// Side length of a map block in nodes.
pub const BLOCK_SIZE: i32 = 16;

/// Nodes per map block (16^3).
pub const NODES_PER_BLOCK: usize = 4096;

/// Smallest valid block coordinate on any axis.
pub const BLOCK_AXIS_MIN: i16 = -2048;

/// One past the largest valid block coordinate on any axis.
pub const BLOCK_AXIS_MAX: i16 = 2048;

/// Number of distinct values per axis in the packed position key (2^12).
pub const AXIS_SPAN: i64 = 4096;

/// Multiplier of the Y component in the packed position key (2^12).
pub const KEY_Y_STRIDE: i64 = 0x1000;

/// Multiplier of the Z component in the packed position key (2^24).
pub const KEY_Z_STRIDE: i64 = 0x100_0000;

/// Node-unit height bounds used when no --min-y/--max-y is given.
pub const DEFAULT_MIN_Y: i32 = i16::MIN as i32;
pub const DEFAULT_MAX_Y: i32 = i16::MAX as i32;
