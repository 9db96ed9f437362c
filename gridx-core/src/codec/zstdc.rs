use super::{Codec, CodecId};
use crate::error::{GridxError, Result};

pub struct ZstdCodec {
    pub level: i32,
}

impl ZstdCodec {
    /// Level is irrelevant for decoding.
    pub const DECODER: ZstdCodec = ZstdCodec { level: 0 };
}

impl Codec for ZstdCodec {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        Ok(zstd::bulk::compress(plain, self.level.max(1))?)
    }

    fn decode(&self, encoded: &[u8], plain_len: usize) -> Result<Vec<u8>> {
        let plain = zstd::bulk::decompress(encoded, plain_len)?;
        if plain.len() != plain_len {
            return Err(GridxError::Format(format!(
                "zstd payload inflated to {} bytes, expected {plain_len}",
                plain.len()
            )));
        }
        Ok(plain)
    }
}
