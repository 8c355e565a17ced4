// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Line Scoring Server
//!
//! Listens for TCP connections and answers every `\n`-terminated line with either its
//! score or the message of the first rule it fails.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   line\n    ┌──────────────┐
//! │    Client    │ ──────────> │ Accept loop  │ ── spawn ──> task per connection
//! └──────────────┘ <────────── └──────────────┘                 │
//!                    reply\n                         LineBuffer → RuleSet → Scorer
//! ```
//!
//! # Features
//!
//! - One task per connection, replies in request order
//! - Rule set loaded from YAML, environment variables or defaults
//! - Graceful shutdown on SIGINT/SIGTERM with a metrics summary

use anyhow::{Context, Result};
use clap::Parser;
use linescore_core::config::ServerConfig;
use linescore_core::server::Server;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "linescore-server")]
#[command(about = "Line Scoring Server - Validates and scores lines over TCP", long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load configuration from LINESCORE_* environment variables instead of a file
    #[arg(long, default_value = "false")]
    env_mode: bool,

    /// Listen address, overrides the configuration
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = if args.env_mode {
        info!("Loading configuration from environment variables");
        ServerConfig::from_env().context("Failed to load configuration from environment")?
    } else if let Some(path) = &args.config {
        info!("Loading configuration from {}", path.display());
        ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
    } else {
        ServerConfig::default()
    };

    if let Some(listen) = &args.listen {
        config.listen_address = listen.clone();
        config.validate()?;
    }

    Ok(config)
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use futures::stream::StreamExt;
        use signal_hook::consts::signal::*;
        use signal_hook_tokio::Signals;

        match Signals::new([SIGINT, SIGTERM]) {
            Ok(mut signals) => {
                if let Some(signal) = signals.next().await {
                    info!("Received signal: {:?}", signal);
                }
            }
            Err(e) => {
                tracing::error!("Failed to register signal handlers: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(windows)]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
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

    info!("Line Scoring Server v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    let server = Server::bind(&config)
        .await
        .with_context(|| format!("Failed to start server on {}", config.listen_address))?;
    let metrics = server.metrics();

    server.run_until(wait_for_shutdown()).await?;

    let summary = metrics.snapshot();
    info!(
        "Served {} connection(s), {} line(s) ({} rejected, {} bytes) in {} s; latency p50 {:?} us, p99 {:?} us",
        summary.connections_total,
        summary.lines_total,
        summary.lines_rejected,
        summary.bytes_received,
        summary.uptime_seconds,
        summary.latency_p50_micros,
        summary.latency_p99_micros
    );
    info!("Server shut down gracefully");
    Ok(())
}
