// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Line Scoring Core Library
//!
//! This crate provides the building blocks of the line scoring service: a constrained
//! random-string generator, a pluggable validation rule pipeline, the scoring function
//! and the line-oriented TCP protocol spoken between client and server.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `generator`: Random alphanumeric strings with non-adjacent spaces
//! - `rules`: Ordered, first-failure-wins validation pipeline
//! - `scorer`: Numeric weighting of accepted lines
//! - `buffer`: Incremental line reassembly across partial reads
//! - `protocol`: Reply encoding and parsing
//! - `server`: Accept loop and per-connection handler
//! - `client`: Single-connection session replaying a corpus
//! - `config`: Configuration management with validation
//! - `error`: Unified error types
//!
//! # Data Flow
//!
//! ```text
//! ┌──────────────┐  corpus  ┌──────────────┐  line\n   ┌──────────────┐
//! │  Generator   │ ───────> │    Client    │ ────────> │    Server    │
//! └──────────────┘          └──────────────┘ <──────── │ Rules→Scorer │
//!                                 │          reply\n   └──────────────┘
//!                                 v
//!                           results file
//! ```

pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod protocol;
pub mod retry;
pub mod rules;
pub mod scorer;
pub mod server;

pub use error::{Error, Result};
pub use generator::{GeneratedString, StringGenerator};
pub use rules::{Rule, RuleSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 65432;

/// Default socket read chunk size (1 KiB)
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
