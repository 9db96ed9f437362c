use crate::error::{GridxError, Result};
use crate::id::{MAX_ID_BYTES, MIN_ID_BYTES};
use crate::naming::NameMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;
/// Upper bound on `chunk_size`; writers and readers hold a full chunk in memory.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Maximum payload length of one chunk (C).
    pub chunk_size: usize,
    /// Random bytes per file id; hex doubles the printed length.
    pub id_bytes: usize,
    pub naming: NameMode,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            id_bytes: MIN_ID_BYTES,
            naming: NameMode::Keep,
        }
    }
}

impl StoreOptions {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(GridxError::Config("chunk_size must be positive".into()));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(GridxError::Config(format!(
                "chunk_size must be at most {MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if !(MIN_ID_BYTES..=MAX_ID_BYTES).contains(&self.id_bytes) {
            return Err(GridxError::Config(format!(
                "id_bytes must be {MIN_ID_BYTES}..={MAX_ID_BYTES}, got {}",
                self.id_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let o = StoreOptions::default();
        o.validate().unwrap();
        assert_eq!(o.chunk_size, 256 * 1024);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let o = StoreOptions {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(o.validate(), Err(GridxError::Config(_))));
    }

    #[test]
    fn oversized_chunk_size_is_rejected() {
        let mut o = StoreOptions {
            chunk_size: MAX_CHUNK_SIZE,
            ..Default::default()
        };
        o.validate().unwrap();
        o.chunk_size += 1;
        assert!(matches!(o.validate(), Err(GridxError::Config(_))));
        o.chunk_size = usize::MAX;
        assert!(matches!(o.validate(), Err(GridxError::Config(_))));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let o: StoreOptions = serde_json::from_str(r#"{"chunk_size": 4}"#).unwrap();
        assert_eq!(o.chunk_size, 4);
        assert_eq!(o.id_bytes, MIN_ID_BYTES);
        assert_eq!(o.naming, NameMode::Keep);
    }
}
