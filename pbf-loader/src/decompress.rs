use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::trace;

use crate::container::MAX_BLOB_SIZE;
use crate::error::BlockError;
use crate::osm_pbf::{blob::Data, Blob};

/// Return the uncompressed payload of `blob`.
///
/// Raw payloads are returned as they are. Zlib payloads must inflate to exactly
/// `raw_size` bytes, which may not exceed `MAX_BLOB_SIZE`. Every other
/// compression scheme is reported as an unsupported encoding.
pub fn decompress_blob(blob: Blob) -> Result<Vec<u8>, BlockError> {
    match blob.data {
        Some(Data::Raw(raw)) => {
            trace!("Raw blob: {} bytes", raw.len());
            Ok(raw)
        }
        Some(Data::ZlibData(compressed)) => {
            let raw_size = blob.raw_size.ok_or(BlockError::MissingRawSize)?;
            if raw_size > MAX_BLOB_SIZE {
                return Err(BlockError::RawSizeTooLarge(raw_size));
            }
            let expected =
                usize::try_from(raw_size).map_err(|_| BlockError::NegativeRawSize(raw_size))?;
            inflate_exact(&compressed, expected)
        }
        Some(Data::LzmaData(_)) => Err(BlockError::UnsupportedEncoding("lzma")),
        Some(Data::ObsoleteBzip2Data(_)) => Err(BlockError::UnsupportedEncoding("bzip2")),
        Some(Data::Lz4Data(_)) => Err(BlockError::UnsupportedEncoding("lz4")),
        Some(Data::ZstdData(_)) => Err(BlockError::UnsupportedEncoding("zstd")),
        None => Err(BlockError::UnsupportedEncoding("unknown")),
    }
}

fn inflate_exact(compressed: &[u8], expected: usize) -> Result<Vec<u8>, BlockError> {
    // One byte past the declared size is enough to notice an oversized stream.
    let mut decoder = ZlibDecoder::new(compressed).take(expected as u64 + 1);
    let mut data = Vec::with_capacity(expected);
    decoder.read_to_end(&mut data)?;
    if data.len() != expected {
        return Err(BlockError::SizeMismatch { got: data.len(), expected });
    }
    trace!("Inflated zlib blob: {} -> {} bytes", compressed.len(), expected);
    Ok(data)
}
