/// Errors that can occur while decoding a map block.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported map version {0}")]
    UnsupportedFormatVersion(u8),

    #[error("unsupported map version (content width {content_width}, params width {params_width})")]
    UnsupportedNodeWidth { content_width: u8, params_width: u8 },

    #[error("malformed compressed stream: {0}")]
    MalformedCompressedStream(String),

    #[error("truncated block: needed {needed} bytes at offset {offset}, block has {len}")]
    Truncated {
        needed: usize,
        offset: usize,
        len: usize,
    },
}
