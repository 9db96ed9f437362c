use crate::id::FileId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The byte source feeding an upload failed or went away.
    #[error("Source stream error: {0}")]
    Source(String),

    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Chunk {sequence} of file {file_id} not found")]
    ChunkNotFound { file_id: FileId, sequence: u64 },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Upload {id} failed: {source}")]
    UploadFailed {
        id: FileId,
        #[source]
        source: Box<GridxError>,
    },

    #[error("File {id} is corrupt: {reason}")]
    CorruptFile { id: FileId, reason: String },
}

impl GridxError {
    /// Expected lookups that found nothing; surfaced to callers as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GridxError::FileNotFound(_) | GridxError::ChunkNotFound { .. }
        )
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        GridxError::Io(std::io::Error::other(format!("{what} lock poisoned")))
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, GridxError>;
