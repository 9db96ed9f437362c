#![forbid(unsafe_code)]

pub mod error;
pub mod options;

pub mod id;
pub mod naming;

pub mod codec;
pub mod domain;
pub mod stats;

pub mod store;

pub mod catalog;
pub mod reader;
pub mod writer;

pub mod vault;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports: stable API surface
pub use catalog::{Catalog, SweepReport};
pub use domain::{FileRecord, FileStatus};
pub use error::{GridxError, Result};
pub use id::FileId;
pub use naming::NameMode;
pub use options::StoreOptions;
pub use reader::FileReader;
pub use stats::Stats;
pub use store::{Backend, ChunkStore, SharedStore};
pub use vault::Vault;
pub use writer::{StreamWriter, UploadSession};
