use crate::chunk::ChunkData;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

const MAGIC: &[u8; 4] = b"CVCK";
const VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Chunk payload too short")]
    TooShort,
    #[error("Invalid chunk magic bytes")]
    Magic,
    #[error("Unsupported chunk payload version: {0}")]
    Version(u32),
    #[error("Chunk serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Chunk compression failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes a chunk independent of any world storage layout.
pub fn encode_chunk(chunk: &ChunkData) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(chunk)?;
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(payload.len() / 4), Compression::fast());
    encoder.write_all(&payload)?;
    let compressed = encoder.finish()?;

    let mut buf = Vec::with_capacity(8 + compressed.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&compressed);
    Ok(buf)
}

pub fn decode_chunk(data: &[u8]) -> Result<ChunkData, CodecError> {
    if data.len() < 8 {
        return Err(CodecError::TooShort);
    }
    if &data[0..4] != MAGIC {
        return Err(CodecError::Magic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != VERSION {
        return Err(CodecError::Version(version));
    }

    let mut payload = Vec::new();
    ZlibDecoder::new(&data[8..]).read_to_end(&mut payload)?;
    Ok(bincode::deserialize(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{BlockCell, ChunkCoord};

    #[test]
    fn test_encode_decode_preserves_chunk() {
        let mut chunk = ChunkData::new(ChunkCoord::new(-4, 9), 2);
        chunk.set_block(3, 17, 8, BlockCell::new(98, 3));
        chunk.set_biome(1, 1, 12);
        chunk.recalculate_height_map();

        let bytes = encode_chunk(&chunk).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(decode_chunk(&bytes).unwrap(), chunk);
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert!(matches!(decode_chunk(b"CV"), Err(CodecError::TooShort)));
        assert!(matches!(
            decode_chunk(b"NOPE\x01\x00\x00\x00"),
            Err(CodecError::Magic)
        ));
        assert!(matches!(
            decode_chunk(b"CVCK\x02\x00\x00\x00"),
            Err(CodecError::Version(2))
        ));
    }
}
