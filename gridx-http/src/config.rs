use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gridx_core::options::DEFAULT_CHUNK_SIZE;
use gridx_core::{Backend, NameMode, StoreOptions};

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "gridx HTTP file service", long_about = None)]
pub struct ServerConfig {
    #[arg(long, env = "GRIDX_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Store directory; required unless --in-memory is set
    #[arg(long, env = "GRIDX_DATA_DIR", required_unless_present = "in_memory")]
    pub data_dir: Option<PathBuf>,

    /// Keep everything in process memory
    #[arg(long, conflicts_with = "data_dir")]
    pub in_memory: bool,

    #[arg(long, env = "GRIDX_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, env = "GRIDX_ID_BYTES", default_value_t = 8)]
    pub id_bytes: usize,

    #[arg(long, env = "GRIDX_NAMING", default_value_t = NameMode::IdExt)]
    pub naming: NameMode,

    /// Compress chunks with zstd at this level
    #[arg(long, env = "GRIDX_ZSTD_LEVEL")]
    pub zstd_level: Option<i32>,

    /// Request body cap for uploads; unlimited when unset
    #[arg(long, env = "GRIDX_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// 0 disables the background sweep
    #[arg(long, env = "GRIDX_SWEEP_INTERVAL_SECS", default_value_t = 600)]
    pub sweep_interval_secs: u64,

    #[arg(long, env = "GRIDX_PENDING_GRACE_SECS", default_value_t = 3600)]
    pub pending_grace_secs: u64,

    /// Allow cross-origin requests from any origin
    #[arg(long)]
    pub cors: bool,
}

impl ServerConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            chunk_size: self.chunk_size,
            id_bytes: self.id_bytes,
            naming: self.naming,
        }
    }

    pub fn backend(&self) -> Backend {
        match (&self.data_dir, self.in_memory) {
            (Some(root), false) => Backend::Fs {
                root: root.clone(),
                zstd_level: self.zstd_level,
            },
            _ => Backend::Memory,
        }
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    pub fn pending_grace(&self) -> Duration {
        Duration::from_secs(self.pending_grace_secs)
    }
}
