// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Error types for the line scoring system
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error handling.
//! Rule rejections are deliberately absent: a rejected line is a normal outcome of
//! [`crate::RuleSet::evaluate`], not an error.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for line scoring operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A resolved length cannot host the resolved number of non-adjacent spaces
    #[error("Insufficient length: {length} characters cannot host {spaces} non-adjacent inner spaces")]
    InsufficientLength { length: usize, spaces: usize },

    /// Socket operation failed
    #[error("Transport error during {operation} with {peer}: {source}")]
    Transport {
        peer: String,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Peer violated the line protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an I/O error with the peer and the operation that failed
    pub fn transport(peer: impl ToString, operation: &'static str, source: std::io::Error) -> Self {
        Error::Transport {
            peer: peer.to_string(),
            operation,
            source,
        }
    }

    /// Check if error comes from generator constraints
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Error::InsufficientLength { .. })
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<envy::Error> for Error {
    fn from(e: envy::Error) -> Self {
        Error::Config(format!("Failed to parse environment variables: {}", e))
    }
}
