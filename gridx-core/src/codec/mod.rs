use crate::error::{GridxError, Result};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

impl TryFrom<u8> for CodecId {
    type Error = GridxError;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(CodecId::Store),
            1 => Ok(CodecId::Zstd),
            other => Err(GridxError::Format(format!("unknown codec id {other}"))),
        }
    }
}

/// Encodes one chunk payload for storage and back.
pub trait Codec: Send + Sync {
    fn id(&self) -> CodecId;
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>>;
    /// `plain_len` is the recorded uncompressed length; output must match it.
    fn decode(&self, encoded: &[u8], plain_len: usize) -> Result<Vec<u8>>;
}

pub fn codec_for(id: CodecId) -> &'static dyn Codec {
    match id {
        CodecId::Store => &store::Store,
        CodecId::Zstd => &zstdc::ZstdCodec::DECODER,
    }
}

/// True if `encoded_len` saves at least `min_gain` of `plain_len`.
pub fn worth_it(plain_len: usize, encoded_len: usize, min_gain: f32) -> bool {
    (plain_len as f64 - encoded_len as f64) >= (plain_len as f64 * min_gain as f64)
}

pub mod store;
pub mod zstdc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_threshold() {
        assert!(worth_it(100, 90, 0.05));
        assert!(!worth_it(100, 99, 0.05));
        assert!(!worth_it(100, 120, 0.0));
    }

    #[test]
    fn unknown_codec_is_format_error() {
        assert!(matches!(CodecId::try_from(9), Err(GridxError::Format(_))));
        assert_eq!(CodecId::try_from(1).unwrap(), CodecId::Zstd);
    }
}
