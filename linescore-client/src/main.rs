// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Line Scoring Client
//!
//! Generates a corpus of random strings, writes it to disk, then streams it to the
//! scoring server over a single connection and records every accepted score.
//!
//! ```text
//! ┌──────────────┐   chains.txt   ┌──────────────┐   line\n   ┌──────────────┐
//! │  Generator   │ ─────────────> │    Client    │ ─────────> │    Server    │
//! └──────────────┘                └──────────────┘ <───────── └──────────────┘
//!                                        │          reply\n
//!                                        v
//!                                   results.txt
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use linescore_core::config::{ClientConfig, GenerationConfig, SizeSpec};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "linescore-client")]
#[command(about = "Line Scoring Client - Generates strings and scores them on the server", long_about = None)]
struct Args {
    /// Number of strings to generate
    #[arg(long, default_value = "10")]
    count: usize,

    /// Fixed length or range (e.g. 10 or 10:20)
    #[arg(long, default_value = "50:100")]
    length: SizeSpec,

    /// Number of spaces, fixed or range (e.g. 3 or 2:4)
    #[arg(long, default_value = "3:5")]
    spaces: SizeSpec,

    /// Seed for a reproducible corpus
    #[arg(long)]
    seed: Option<u64>,

    /// Server IP address
    #[arg(long, default_value = linescore_core::DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(long, default_value_t = linescore_core::DEFAULT_PORT)]
    port: u16,

    /// File the generated corpus is written to
    #[arg(long, default_value = "chains.txt")]
    input: PathBuf,

    /// File to save the results
    #[arg(long, default_value = "results.txt")]
    output: PathBuf,

    /// Maximum connection attempts
    #[arg(long, default_value = "5")]
    max_retries: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .json()
        .init();

    info!("Line Scoring Client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig {
        server_address: format!("{}:{}", args.host, args.port),
        corpus_path: args.input,
        results_path: args.output,
        max_retries: args.max_retries,
        ..Default::default()
    };
    let generation = GenerationConfig {
        length: args.length,
        blank_spaces: args.spaces,
        count: args.count,
        seed: args.seed,
    };

    info!(
        "Starting process: {} string(s), length {}, spaces {}",
        generation.count, generation.length, generation.blank_spaces
    );

    let summary = linescore_core::client::run(&config, generation)
        .await
        .with_context(|| format!("Scoring session with {} failed", config.server_address))?;

    info!(
        "Results written to {} ({} of {} line(s) accepted)",
        config.results_path.display(),
        summary.accepted,
        summary.sent
    );
    info!("Total process time: {:.3} seconds", summary.elapsed.as_secs_f64());
    Ok(())
}
