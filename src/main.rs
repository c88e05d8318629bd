// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "video-stage")]
#[command(about = "Staged video pipeline: receive, decode, convert and deliver frames")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline until end of stream, an error or Ctrl+C
    Run {
        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Video endpoint as host:port (default: 192.168.1.1:5555)
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Use the TCP stream transport instead of UDP
        #[arg(long)]
        tcp: bool,

        /// Replay a recorded stream instead of connecting
        #[arg(long, conflicts_with_all = ["endpoint", "tcp"])]
        replay: Option<PathBuf>,

        /// Record decoded frames into this directory
        #[arg(short, long)]
        record: Option<PathBuf>,

        /// Stop after this many delivered frames
        #[arg(short, long)]
        frames: Option<u64>,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the default configuration as JSON
    Config {
        /// Write the configuration to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });

    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=video_stage=debug, RUST_LOG=info
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    match cli.command {
        Commands::Run {
            config,
            endpoint,
            tcp,
            replay,
            record,
            frames,
            verbose: _,
        } => cli::run_pipeline(cli::RunOptions {
            config,
            endpoint,
            tcp,
            replay,
            record,
            frames,
        }),
        Commands::Config { output } => cli::print_config(output),
    }
}
