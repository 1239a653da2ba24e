//! Chunk blob format: CBOR `{ size, samples }`, zstd-compressed.

use crate::StoreError;
use chunkworld_kernel::{ChunkData, ValidationError};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

const ZSTD_LEVEL: i32 = 3;

/// Why a stored chunk blob could not be turned back into a grid.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("decompression failed: {0}")]
    Zstd(#[from] std::io::Error),
    #[error("CBOR deserialization error: {0}")]
    Cbor(String),
    #[error("size {found} does not match chunk size {expected}")]
    SizeMismatch { expected: u32, found: u32 },
    #[error(transparent)]
    Shape(#[from] ValidationError),
}

#[derive(Serialize)]
struct BlobRef<'a> {
    size: u32,
    samples: &'a [f64],
}

#[derive(Deserialize)]
struct Blob {
    size: u32,
    samples: Vec<f64>,
}

pub fn encode_chunk(data: &ChunkData) -> Result<Vec<u8>, StoreError> {
    let mut cbor = Vec::new();
    let blob = BlobRef {
        size: data.size(),
        samples: data.samples(),
    };
    ciborium::into_writer(&blob, &mut cbor).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    let mut encoder = zstd::Encoder::new(Vec::new(), ZSTD_LEVEL)?;
    encoder.write_all(&cbor)?;
    Ok(encoder.finish()?)
}

/// Decode a blob written by [`encode_chunk`], requiring a grid of
/// `expected_size` per side.
pub fn decode_chunk(bytes: &[u8], expected_size: u32) -> Result<ChunkData, DecodeError> {
    let mut decoder = zstd::Decoder::new(bytes)?;
    let mut cbor = Vec::new();
    decoder.read_to_end(&mut cbor)?;
    let blob: Blob = ciborium::from_reader(cbor.as_slice()).map_err(|e| DecodeError::Cbor(e.to_string()))?;
    if blob.size != expected_size {
        return Err(DecodeError::SizeMismatch {
            expected: expected_size,
            found: blob.size,
        });
    }
    Ok(ChunkData::from_samples(blob.size, blob.samples)?)
}
