//! Confab CLI and REST API entry point.
//!
//! Binary name: `confab`
//!
//! Parses CLI arguments, wires the in-memory services, then either enters
//! the interactive chat loop or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,confab=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let state = AppState::init().await?;

    match cli.command {
        Commands::Chat {
            title,
            model,
            no_stream,
        } => {
            cli::chat::run_chat_loop(&state, title, model, no_stream).await?;
        }

        Commands::Serve { host, port } => {
            http::serve(state, &host, port).await?;
        }
    }

    Ok(())
}
