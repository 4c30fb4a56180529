//! Constants and layout rules of the serialized map block format.

use crate::error::DecodeError;

/// Oldest block format version this decoder understands.
pub const MIN_FORMAT_VERSION: u8 = 22;

/// First version that compresses the whole block with zstd and puts the
/// name mapping ahead of the node data.
pub const ZSTD_FORMAT_VERSION: u8 = 29;

/// First version that carries a 16-bit lighting_complete field in the header.
pub const LIGHTING_FORMAT_VERSION: u8 = 27;

/// Block version whose node timers are a single placeholder byte.
pub const SINGLE_BYTE_TIMERS_VERSION: u8 = 23;

/// Block version whose node timers are a versioned table.
pub const TIMER_TABLE_VERSION: u8 = 24;

/// Bytes per node timer record in the version 24 table.
pub const NODE_TIMER_SIZE: usize = 10;

/// Fixed part of a static object record (type + three i32 coordinates).
pub const STATIC_OBJECT_HEADER_SIZE: usize = 13;

/// Size of the block timestamp.
pub const TIMESTAMP_SIZE: usize = 4;

/// The only supported params width (param1 + param2).
pub const PARAMS_WIDTH: u8 = 2;

/// Offset of param2 from a node's param0 when content ids are one byte wide.
pub const PARAM2_OFFSET: usize = 0x2000;

/// Largest content id that is stored directly in a one-byte content field.
pub const MAX_SHORT_CONTENT_ID: u16 = 0x7f;

/// Node names that never render and are kept out of the name table.
pub const AIR_NAME: &str = "air";
pub const IGNORE_NAME: &str = "ignore";

/// Reject versions older than [`MIN_FORMAT_VERSION`].
pub fn check_version(version: u8) -> Result<(), DecodeError> {
    if version < MIN_FORMAT_VERSION {
        return Err(DecodeError::UnsupportedFormatVersion(version));
    }
    Ok(())
}

/// Content ids must be 1 or 2 bytes wide and the params exactly 2 bytes.
pub fn check_node_widths(content_width: u8, params_width: u8) -> Result<(), DecodeError> {
    if !matches!(content_width, 1 | 2) || params_width != PARAMS_WIDTH {
        return Err(DecodeError::UnsupportedNodeWidth {
            content_width,
            params_width,
        });
    }
    Ok(())
}

/// Offset of the content width byte (v22-28, counted from the version byte)
/// or of the name mapping (v29+, counted into the decompressed payload).
pub fn header_size(version: u8) -> usize {
    if version >= ZSTD_FORMAT_VERSION {
        7
    } else if version >= LIGHTING_FORMAT_VERSION {
        4
    } else {
        2
    }
}
