mod api;
mod config;
mod events;
mod llm;
mod logging;
mod profile;
mod server;
mod tui;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::api::HttpChatBackend;
use crate::config::Config;
use crate::profile::{FileProfileStore, MemoryProfileStore, ProfileStore};

#[derive(Parser)]
#[command(name = "sparkchat")]
#[command(version)]
#[command(about = "Minimal LLM chat: a completion proxy and a terminal client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat proxy that forwards messages to the completion provider
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:3000
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Open the terminal chat client (default)
    Chat {
        /// Base URL of a running proxy
        #[arg(short, long)]
        server: Option<String>,
        /// Display name for this session; skips the name prompt and is not saved
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Some(Commands::Serve { bind }) => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            logging::init_stderr(&config.log_level);
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "sparkchat proxy starting");
            server::serve(&config).await
        }
        Some(Commands::Chat { server, name }) => chat(config, server, name).await,
        None => chat(config, None, None).await,
    }
}

async fn chat(mut config: Config, server: Option<String>, name: Option<String>) -> Result<()> {
    if let Some(server) = server {
        config.client.server_url = server;
    }

    let _guard = logging::init_file(&config.log_dir(), &config.log_level)?;
    tracing::info!(server = %config.client.server_url, "sparkchat client starting");

    let profile: Box<dyn ProfileStore> = match name {
        Some(name) => Box::new(MemoryProfileStore::with_name(profile::name_or_default(&name))),
        None => Box::new(FileProfileStore::new(config.profile_path())),
    };
    let backend = HttpChatBackend::new(&config.client.server_url)
        .context("Failed to create chat client")?;

    ui::run(profile, Arc::new(backend)).await
}
