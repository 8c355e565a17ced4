// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Incremental line reassembly
//!
//! A socket read can deliver any slice of the byte stream: nothing, part of a line,
//! exactly one line or several. [`LineBuffer`] accumulates bytes across reads and hands
//! out every complete `\n`-terminated line, keeping the trailing fragment for the next
//! read.
//!
//! # Design
//!
//! - One growable `BytesMut` per connection, never shared
//! - Lines are split off the front without copying (`BytesMut::split_to`)
//! - Bytes already scanned for a newline are not scanned again
//! - No length limit: a peer that never sends `\n` keeps the buffer growing until it
//!   disconnects

use bytes::{Bytes, BytesMut};

const LINE_TERMINATOR: u8 = b'\n';

/// Per-connection receive buffer
///
/// Unbounded; an unterminated line is held in full until its `\n` arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    /// Prefix of `buf` known not to contain a terminator
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            scanned: 0,
        }
    }

    /// Append received bytes and iterate over the lines completed so far
    ///
    /// The iterator is lazy. Lines it does not yield stay buffered and are returned by
    /// the next call.
    pub fn feed(&mut self, data: &[u8]) -> Lines<'_> {
        self.extend(data);
        Lines { buffer: self }
    }

    /// Append received bytes without draining any line
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Split off the next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<Bytes> {
        let offset = self.buf[self.scanned..]
            .iter()
            .position(|&b| b == LINE_TERMINATOR);

        match offset {
            Some(offset) => {
                let end = self.scanned + offset;
                let mut line = self.buf.split_to(end + 1);
                line.truncate(end);
                self.scanned = 0;
                Some(line.freeze())
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Bytes received after the last terminator
    pub fn remainder(&self) -> &[u8] {
        &self.buf
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

/// Complete lines available in a [`LineBuffer`]
pub struct Lines<'a> {
    buffer: &'a mut LineBuffer,
}

impl Iterator for Lines<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        self.buffer.next_line()
    }
}
