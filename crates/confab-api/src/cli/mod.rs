//! CLI command definitions for the `confab` binary.
//!
//! Uses clap derive macros for argument parsing. The store is in-memory,
//! so the CLI surface is the interactive chat loop and the server; chat
//! management across invocations belongs to the REST API.

pub mod chat;

use clap::{Parser, Subcommand};

/// Chat with a streaming assistant.
#[derive(Parser)]
#[command(name = "confab", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a chat and enter the interactive loop.
    Chat {
        /// Title for the new chat.
        #[arg(long)]
        title: Option<String>,

        /// Completion model (defaults to the configured model).
        #[arg(long)]
        model: Option<String>,

        /// Disable incremental streaming for this chat.
        #[arg(long)]
        no_stream: bool,
    },

    /// Start the REST API server.
    Serve {
        /// Interface to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(long, short, default_value_t = 8317)]
        port: u16,
    },
}
