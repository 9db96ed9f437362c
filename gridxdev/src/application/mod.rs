pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use gridx_core::error::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Put {
            store,
            src,
            name,
            content_type,
            chunk_size,
            naming,
            zstd,
        } => handlers::handle_put(store, src, name, content_type, chunk_size, naming, zstd),
        Commands::Ls { store, long } => handlers::handle_ls(store, long),
        Commands::Cat { store, file } => handlers::handle_cat(store, file),
        Commands::Get { store, file, out } => handlers::handle_get(store, file, out),
        Commands::Rm { store, id } => handlers::handle_rm(store, id),
        Commands::Resolve { store, name } => handlers::handle_resolve(store, name),
        Commands::Verify { store } => handlers::handle_verify(store),
        Commands::Stats { store } => handlers::handle_stats(store),
        Commands::Sweep { store, grace_secs } => handlers::handle_sweep(store, grace_secs),
    }
}
