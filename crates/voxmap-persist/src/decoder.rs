//! Map block decoder.
//!
//! A block is 16x16x16 nodes. Each node stores a content id that is resolved
//! to a name through the per-block name mapping. Formats 22 to 28 keep the
//! header uncompressed and zlib-compress node data and metadata separately,
//! with the mapping trailing the block. Format 29 and later zstd-compress
//! everything after the version byte and move the mapping to the front.

use std::collections::HashMap;

use voxmap_core::constants::NODES_PER_BLOCK;

use crate::compress;
use crate::error::DecodeError;
use crate::format::*;
use crate::reader::ByteReader;

/// Progress of a decode. Queries only answer in `GridReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Empty,
    HeaderRead,
    PayloadDecompressed,
    NameMapLoaded,
    GridReady,
}

/// Reusable decoder for one block at a time.
#[derive(Debug)]
pub struct BlockDecoder {
    state: DecoderState,
    version: u8,
    content_width: u8,
    node_data: Vec<u8>,
    names: HashMap<u16, String>,
    air_id: Option<u16>,
    ignore_id: Option<u16>,
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Empty,
            version: 0,
            content_width: 0,
            node_data: Vec::new(),
            names: HashMap::new(),
            air_id: None,
            ignore_id: None,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Format version of the last decoded block.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Drop the previous block. Buffers keep their capacity.
    pub fn reset(&mut self) {
        self.state = DecoderState::Empty;
        self.version = 0;
        self.content_width = 0;
        self.node_data.clear();
        self.names.clear();
        self.air_id = None;
        self.ignore_id = None;
    }

    /// Decode a serialized block, replacing whatever was loaded before.
    ///
    /// On error the decoder is left in the `Empty` state.
    pub fn decode(&mut self, raw: &[u8]) -> Result<(), DecodeError> {
        self.reset();
        let result = self.decode_inner(raw);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn decode_inner(&mut self, raw: &[u8]) -> Result<(), DecodeError> {
        let mut header = ByteReader::new(raw);
        let version = header.read_u8()?;
        check_version(version)?;
        self.version = version;
        self.state = DecoderState::HeaderRead;

        if version >= ZSTD_FORMAT_VERSION {
            let payload = compress::decompress_zstd(header.remaining())?;
            self.state = DecoderState::PayloadDecompressed;

            let mut r = ByteReader::new(&payload);
            r.skip(header_size(version))?;
            self.read_name_map(&mut r)?;
            self.state = DecoderState::NameMapLoaded;

            let content_width = r.read_u8()?;
            let params_width = r.read_u8()?;
            check_node_widths(content_width, params_width)?;
            self.content_width = content_width;

            let grid_len = grid_len(content_width);
            self.node_data.extend_from_slice(r.take(grid_len)?);
        } else {
            let mut r = ByteReader::new(raw);
            r.skip(header_size(version))?;
            let content_width = r.read_u8()?;
            let params_width = r.read_u8()?;
            check_node_widths(content_width, params_width)?;
            self.content_width = content_width;

            let (nodes, used) = compress::decompress_zlib(r.remaining())?;
            r.skip(used)?;
            // Node metadata is not needed for rendering.
            let (_, used) = compress::decompress_zlib(r.remaining())?;
            r.skip(used)?;
            if nodes.len() < grid_len(content_width) {
                return Err(DecodeError::Truncated {
                    needed: grid_len(content_width),
                    offset: 0,
                    len: nodes.len(),
                });
            }
            self.node_data = nodes;
            self.state = DecoderState::PayloadDecompressed;

            skip_node_timers(&mut r, version)?;
            skip_static_objects(&mut r)?;
            r.skip(TIMESTAMP_SIZE)?;
            self.read_name_map(&mut r)?;
            self.state = DecoderState::NameMapLoaded;
        }

        self.state = DecoderState::GridReady;
        Ok(())
    }

    fn read_name_map(&mut self, r: &mut ByteReader<'_>) -> Result<(), DecodeError> {
        r.skip(1)?; // mapping version
        let count = r.read_u16()?;
        for _ in 0..count {
            let id = r.read_u16()?;
            let len = r.read_u16()? as usize;
            let name = String::from_utf8_lossy(r.take(len)?).into_owned();
            match name.as_str() {
                AIR_NAME => self.air_id = Some(id),
                IGNORE_NAME => self.ignore_id = Some(id),
                _ => {
                    self.names.insert(id, name);
                }
            }
        }
        Ok(())
    }

    /// True when the block contains nothing but air and ignore nodes.
    pub fn is_empty(&self) -> bool {
        self.state == DecoderState::GridReady && self.names.is_empty()
    }

    /// Content id at block-local coordinates, each in `0..16`.
    pub fn content_id(&self, x: u8, y: u8, z: u8) -> Option<u16> {
        if self.state != DecoderState::GridReady || x >= 16 || y >= 16 || z >= 16 {
            return None;
        }
        let index = x as usize + 16 * y as usize + 256 * z as usize;
        Some(self.read_content(index))
    }

    /// Name of the node at block-local coordinates, or `None` for air,
    /// ignore, and ids missing from the name mapping.
    pub fn get_node(&self, x: u8, y: u8, z: u8) -> Option<&str> {
        let id = self.content_id(x, y, z)?;
        if Some(id) == self.air_id || Some(id) == self.ignore_id {
            return None;
        }
        match self.names.get(&id) {
            Some(name) => Some(name.as_str()),
            None => {
                log::warn!("Skipping node with invalid content id {id}");
                None
            }
        }
    }

    fn read_content(&self, index: usize) -> u16 {
        if self.content_width == 2 {
            let at = index * 2;
            u16::from_be_bytes([self.node_data[at], self.node_data[at + 1]])
        } else {
            let param0 = self.node_data[index] as u16;
            if param0 <= MAX_SHORT_CONTENT_ID {
                param0
            } else {
                let param2 = self.node_data[index + PARAM2_OFFSET] as u16;
                (param0 << 4) | (param2 >> 4)
            }
        }
    }
}

/// Bytes of node data: content ids plus param1 and param2.
fn grid_len(content_width: u8) -> usize {
    NODES_PER_BLOCK * (content_width as usize + PARAMS_WIDTH as usize)
}

fn skip_node_timers(r: &mut ByteReader<'_>, version: u8) -> Result<(), DecodeError> {
    if version == SINGLE_BYTE_TIMERS_VERSION {
        r.skip(1)?;
    } else if version == TIMER_TABLE_VERSION {
        let timers_version = r.read_u8()?;
        if timers_version == 1 {
            let count = r.read_u16()? as usize;
            r.skip(NODE_TIMER_SIZE * count)?;
        }
    }
    Ok(())
}

fn skip_static_objects(r: &mut ByteReader<'_>) -> Result<(), DecodeError> {
    r.skip(1)?; // version
    let count = r.read_u16()?;
    for _ in 0..count {
        r.skip(STATIC_OBJECT_HEADER_SIZE)?;
        let len = r.read_u16()? as usize;
        r.skip(len)?;
    }
    Ok(())
}
