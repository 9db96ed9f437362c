use super::{Codec, CodecId};
use crate::error::{GridxError, Result};

pub struct Store;

impl Codec for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        Ok(plain.to_vec())
    }

    fn decode(&self, encoded: &[u8], plain_len: usize) -> Result<Vec<u8>> {
        if encoded.len() != plain_len {
            return Err(GridxError::Format(format!(
                "stored payload is {} bytes, expected {plain_len}",
                encoded.len()
            )));
        }
        Ok(encoded.to_vec())
    }
}
