//! Serializer for map blocks in formats 22 through 29.
//!
//! The renderer never writes blocks; this exists so stores and decoders can
//! be exercised against real byte layouts. Only built for tests and with
//! the `test-util` feature.

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::format::*;
use voxmap_core::constants::NODES_PER_BLOCK;

/// One static object record: type byte, position, opaque payload.
#[derive(Debug, Clone, Default)]
pub struct StaticObject {
    pub kind: u8,
    pub pos: [i32; 3],
    pub data: Vec<u8>,
}

/// In-memory block contents plus the format to serialize them in.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    version: u8,
    content_width: u8,
    content: Vec<u16>,
    param1: Vec<u8>,
    param2: Vec<u8>,
    names: Vec<(u16, String)>,
    timers: Vec<[u8; NODE_TIMER_SIZE]>,
    static_objects: Vec<StaticObject>,
    timestamp: u32,
}

impl BlockBuilder {
    /// An all-zero block. Content id 0 is unmapped until [`Self::with_name`]
    /// assigns it.
    pub fn new(version: u8) -> Self {
        Self {
            version,
            content_width: 2,
            content: vec![0; NODES_PER_BLOCK],
            param1: vec![0; NODES_PER_BLOCK],
            param2: vec![0; NODES_PER_BLOCK],
            names: Vec::new(),
            timers: Vec::new(),
            static_objects: Vec::new(),
            timestamp: 0xffff_ffff,
        }
    }

    /// Store content ids in one byte (ids above 0x7f borrow param2's high nibble).
    pub fn content_width(mut self, width: u8) -> Self {
        self.content_width = width;
        self
    }

    pub fn with_name(mut self, id: u16, name: &str) -> Self {
        self.names.push((id, name.to_string()));
        self
    }

    pub fn with_timer(mut self, timer: [u8; NODE_TIMER_SIZE]) -> Self {
        self.timers.push(timer);
        self
    }

    pub fn with_static_object(mut self, object: StaticObject) -> Self {
        self.static_objects.push(object);
        self
    }

    pub fn fill(mut self, id: u16) -> Self {
        self.content.iter_mut().for_each(|c| *c = id);
        self
    }

    /// Set one node; coordinates are block-local.
    pub fn set(mut self, x: usize, y: usize, z: usize, id: u16) -> Self {
        self.content[node_index(x, y, z)] = id;
        self
    }

    /// Fill a horizontal layer at local height `y`.
    pub fn layer(mut self, y: usize, id: u16) -> Self {
        for z in 0..16 {
            for x in 0..16 {
                self.content[node_index(x, y, z)] = id;
            }
        }
        self
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        if self.version >= ZSTD_FORMAT_VERSION {
            self.encode_zstd()
        } else {
            self.encode_zlib()
        }
    }

    fn encode_zstd(&self) -> io::Result<Vec<u8>> {
        let mut payload = Vec::new();
        payload.push(0); // flags
        payload.extend_from_slice(&0u16.to_be_bytes()); // lighting_complete
        payload.extend_from_slice(&self.timestamp.to_be_bytes());
        self.write_name_map(&mut payload);
        payload.push(self.content_width);
        payload.push(PARAMS_WIDTH);
        payload.extend_from_slice(&self.node_data());
        payload.push(0); // node metadata version
        self.write_static_objects(&mut payload);

        let mut out = vec![self.version];
        out.extend(zstd::encode_all(&payload[..], 0)?);
        Ok(out)
    }

    fn encode_zlib(&self) -> io::Result<Vec<u8>> {
        let mut out = vec![self.version, 0];
        if self.version >= LIGHTING_FORMAT_VERSION {
            out.extend_from_slice(&0u16.to_be_bytes());
        }
        out.push(self.content_width);
        out.push(PARAMS_WIDTH);
        out.extend(zlib(&self.node_data())?);
        out.extend(zlib(&[0])?); // empty node metadata

        if self.version == SINGLE_BYTE_TIMERS_VERSION {
            out.push(0);
        } else if self.version == TIMER_TABLE_VERSION {
            out.push(1);
            out.extend_from_slice(&(self.timers.len() as u16).to_be_bytes());
            for timer in &self.timers {
                out.extend_from_slice(timer);
            }
        }

        self.write_static_objects(&mut out);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        self.write_name_map(&mut out);
        Ok(out)
    }

    fn write_name_map(&self, out: &mut Vec<u8>) {
        out.push(0); // mapping version
        out.extend_from_slice(&(self.names.len() as u16).to_be_bytes());
        for (id, name) in &self.names {
            out.extend_from_slice(&id.to_be_bytes());
            out.extend_from_slice(&(name.len() as u16).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
        }
    }

    fn write_static_objects(&self, out: &mut Vec<u8>) {
        out.push(0); // static object version
        out.extend_from_slice(&(self.static_objects.len() as u16).to_be_bytes());
        for object in &self.static_objects {
            out.push(object.kind);
            for c in object.pos {
                out.extend_from_slice(&c.to_be_bytes());
            }
            out.extend_from_slice(&(object.data.len() as u16).to_be_bytes());
            out.extend_from_slice(&object.data);
        }
    }

    /// Content ids, then param1, then param2.
    fn node_data(&self) -> Vec<u8> {
        let mut param2 = self.param2.clone();
        let mut out = Vec::with_capacity(NODES_PER_BLOCK * (self.content_width as usize + 2));
        if self.content_width == 1 {
            for (i, &id) in self.content.iter().enumerate() {
                if id <= MAX_SHORT_CONTENT_ID {
                    out.push(id as u8);
                } else {
                    out.push((id >> 4) as u8);
                    param2[i] = (param2[i] & 0x0f) | (((id & 0x0f) as u8) << 4);
                }
            }
        } else {
            for &id in &self.content {
                out.extend_from_slice(&id.to_be_bytes());
            }
        }
        out.extend_from_slice(&self.param1);
        out.extend_from_slice(&param2);
        out
    }
}

fn node_index(x: usize, y: usize, z: usize) -> usize {
    x + 16 * y + 256 * z
}

fn zlib(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)?;
    enc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_header_layout() {
        let raw = BlockBuilder::new(25).encode().expect("block should encode");
        assert_eq!(raw[0], 25);
        assert_eq!(raw[2], 2, "content width follows version and flags");
        assert_eq!(raw[3], PARAMS_WIDTH);

        let raw = BlockBuilder::new(28).content_width(1).encode().expect("block should encode");
        assert_eq!(raw[4], 1, "lighting_complete shifts the widths by two");
    }

    #[test]
    fn test_zstd_payload_starts_with_flags() {
        let raw = BlockBuilder::new(29).with_name(0, "air").encode().expect("block should encode");
        assert_eq!(raw[0], 29);
        let payload = zstd::decode_all(&raw[1..]).expect("should decompress");
        assert_eq!(payload[0], 0);
        assert_eq!(&payload[3..7], &[0xff; 4]);
        // mapping version, one entry
        assert_eq!(&payload[7..10], &[0, 0, 1]);
    }

    #[test]
    fn test_short_content_ids_borrow_param2() {
        let builder = BlockBuilder::new(25).content_width(1).set(0, 0, 0, 0x812);
        let data = builder.node_data();
        assert_eq!(data[0], 0x81);
        assert_eq!(data[PARAM2_OFFSET] >> 4, 0x2);
    }
}
