use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Complete files.
    pub files: u64,
    pub pending: u64,
    pub deleted: u64,
    /// Chunks belonging to complete files.
    pub chunks: u64,
    pub logical_bytes: u64,
}
