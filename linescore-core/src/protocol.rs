// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Line protocol between client and server
//!
//! Every request is one UTF-8 line terminated by `\n`. The server answers each request
//! with exactly one line, in order:
//!
//! ```text
//! 7.0000\n                                   accepted, score with 4 decimals
//! [error] <rule message> >> <original line>\n  rejected by a rule
//! ```
//!
//! A line without spaces is answered with the numeric sentinel `-1.0000`, never with an
//! error line.

use crate::scorer::UNDEFINED_SCORE;
use crate::{Error, Result};
use std::fmt;

/// Marker opening every rejection reply
pub const ERROR_PREFIX: &str = "[error]";

/// Separator between the rule message and the echoed line
pub const ECHO_SEPARATOR: &str = " >> ";

/// Server reply to one request line
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Line passed every rule
    Score(f64),
    /// Line failed a rule
    Rejected { message: String, line: String },
}

impl Reply {
    /// Serialize to a wire line, terminator included
    pub fn encode(&self) -> String {
        format!("{}\n", self)
    }

    /// Parse a reply line received from the server
    ///
    /// Anything starting with `[` is a rejection; everything else must be a number.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        if raw.starts_with('[') {
            let body = raw.strip_prefix(ERROR_PREFIX).unwrap_or(raw).trim_start();
            let (message, line) = body.split_once(ECHO_SEPARATOR).unwrap_or((body, ""));
            return Ok(Reply::Rejected {
                message: message.to_string(),
                line: line.to_string(),
            });
        }

        raw.parse::<f64>()
            .map(Reply::Score)
            .map_err(|e| Error::Protocol(format!("Invalid score reply '{}': {}", raw, e)))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Reply::Rejected { .. })
    }

    /// True for the sentinel score of a line without spaces
    pub fn is_undefined_score(&self) -> bool {
        matches!(self, Reply::Score(score) if *score == UNDEFINED_SCORE)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Score(score) => write!(f, "{:.4}", score),
            Reply::Rejected { message, line } => {
                write!(f, "{} {}{}{}", ERROR_PREFIX, message, ECHO_SEPARATOR, line)
            }
        }
    }
}
