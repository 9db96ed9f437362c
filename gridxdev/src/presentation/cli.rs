use clap::{Parser, Subcommand};
use gridx_core::NameMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "gridxdev CLI (alpha)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a local file into the store
    Put {
        store: PathBuf,
        /// source file on disk
        src: PathBuf,
        /// name to store under (defaults to the source file name)
        #[arg(long)]
        name: Option<String>,
        /// MIME type recorded with the file
        #[arg(long = "content-type")]
        content_type: Option<String>,
        /// maximum chunk payload in bytes
        #[arg(long, default_value_t = gridx_core::options::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// `keep` the client name or name files `id-ext`
        #[arg(long, default_value_t = NameMode::Keep)]
        naming: NameMode,
        /// compress chunks with zstd at this level
        #[arg(long)]
        zstd: Option<i32>,
    },

    /// List complete files
    Ls {
        store: PathBuf,
        /// show id, size and content type
        #[arg(long)]
        long: bool,
    },

    /// Stream a file (by id or name) to stdout
    Cat { store: PathBuf, file: String },

    /// Download a file (by id or name) to an output path
    Get {
        store: PathBuf,
        file: String,
        out: PathBuf,
    },

    /// Delete a file by id
    Rm { store: PathBuf, id: String },

    /// Print the id a name currently resolves to
    Resolve { store: PathBuf, name: String },

    /// Read every complete file back and check sizes and digests
    Verify { store: PathBuf },

    /// Print record and byte counts
    Stats { store: PathBuf },

    /// Remove tombstones, abandoned uploads and orphaned chunks
    Sweep {
        store: PathBuf,
        /// pending uploads younger than this are left alone
        #[arg(long, default_value_t = 3600)]
        grace_secs: u64,
    },
}
