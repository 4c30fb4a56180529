use std::io::Read;

use flate2::bufread::ZlibDecoder;

use crate::error::DecodeError;

/// Decompress one zstd stream spanning the whole input.
pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    zstd::stream::decode_all(data)
        .map_err(|e| DecodeError::MalformedCompressedStream(format!("zstd: {e}")))
}

/// Decompress the zlib stream at the start of `data`.
///
/// Returns the decompressed bytes and the number of input bytes the stream
/// occupied, so the caller can continue right after it.
pub fn decompress_zlib(data: &[u8]) -> Result<(Vec<u8>, usize), DecodeError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::MalformedCompressedStream(format!("zlib: {e}")))?;
    Ok((out, decoder.total_in() as usize))
}
