//! On-disk framing of one chunk: a fixed header followed by the encoded payload.
//!
//! Layout (little-endian):
//! `[0..6]` magic, `[6..8]` version, `[8]` codec, `[9..17]` plain length,
//! `[17..49]` blake3 of the plain payload, `[49..]` encoded payload.

use crate::codec::{Codec, CodecId, codec_for, worth_it};
use crate::error::{GridxError, Result};
use std::io::{Read, Write};

pub const MAGIC: &[u8; 6] = b"GXCHNK";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 49;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u16,
    pub codec: CodecId,
    pub plain_len: u64,
    pub blake3: [u8; 32],
}

impl FrameHeader {
    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&self.version.to_le_bytes())?;
        w.write_all(&[self.codec as u8])?;
        w.write_all(&self.plain_len.to_le_bytes())?;
        w.write_all(&self.blake3)?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut magic = [0u8; 6];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(GridxError::Format("bad chunk magic".into()));
        }
        let mut v = [0u8; 2];
        r.read_exact(&mut v)?;
        let version = u16::from_le_bytes(v);
        if version != VERSION {
            return Err(GridxError::Format(format!("unsupported chunk version {version}")));
        }
        let mut c = [0u8; 1];
        r.read_exact(&mut c)?;
        let codec = CodecId::try_from(c[0])?;
        let mut pl = [0u8; 8];
        r.read_exact(&mut pl)?;
        let mut blake3 = [0u8; 32];
        r.read_exact(&mut blake3)?;
        Ok(Self {
            version,
            codec,
            plain_len: u64::from_le_bytes(pl),
            blake3,
        })
    }
}

/// Frame `plain`, using `compressor` only when it saves at least `min_gain`.
pub fn encode(plain: &[u8], compressor: Option<&dyn Codec>, min_gain: f32) -> Result<Vec<u8>> {
    let trial = match compressor {
        Some(c) => {
            let enc = c.encode(plain)?;
            worth_it(plain.len(), enc.len(), min_gain).then_some((c.id(), enc))
        }
        None => None,
    };
    let (codec, body) = match trial {
        Some((id, enc)) => (id, enc),
        None => (CodecId::Store, plain.to_vec()),
    };

    let header = FrameHeader {
        version: VERSION,
        codec,
        plain_len: plain.len() as u64,
        blake3: *blake3::hash(plain).as_bytes(),
    };
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    header.write_to(&mut out)?;
    out.extend_from_slice(&body);
    Ok(out)
}

/// Parse a frame and return the verified plain payload.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < HEADER_LEN {
        return Err(GridxError::Format(format!(
            "chunk frame truncated: {} bytes",
            frame.len()
        )));
    }
    let header = FrameHeader::read_from(&frame[..HEADER_LEN])?;
    let plain_len = usize::try_from(header.plain_len)
        .map_err(|_| GridxError::Format("chunk length overflow".into()))?;
    let plain = codec_for(header.codec).decode(&frame[HEADER_LEN..], plain_len)?;
    if blake3::hash(&plain).as_bytes() != &header.blake3 {
        return Err(GridxError::Format("chunk checksum mismatch".into()));
    }
    Ok(plain)
}
