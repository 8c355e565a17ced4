// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! TCP scoring server
//!
//! The accept loop spawns one task per connection. Each task owns its socket and its
//! [`LineBuffer`]; the only state shared between tasks is the read-only [`RuleSet`]
//! and the atomic [`Metrics`].
//!
//! Per connection:
//!
//! ```text
//! AWAITING_DATA ──bytes──> BUFFERING ──'\n'──> DISPATCH(line) ──reply──> AWAITING_DATA
//!       │
//!       └──0 bytes (peer closed)──> CLOSED
//! ```
//!
//! Every complete line is answered before the next one is evaluated, so replies on a
//! connection come back in request order.

use crate::buffer::LineBuffer;
use crate::config::ServerConfig;
use crate::metrics::{LatencySamples, Metrics};
use crate::protocol::Reply;
use crate::rules::RuleSet;
use crate::scorer;
use crate::{Error, Result};
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Evaluates lines read from a single connection
#[derive(Clone)]
pub struct ConnectionHandler {
    rules: Arc<RuleSet>,
    metrics: Metrics,
    read_buffer_size: usize,
}

impl ConnectionHandler {
    pub fn new(rules: Arc<RuleSet>, metrics: Metrics, read_buffer_size: usize) -> Self {
        Self {
            rules,
            metrics,
            read_buffer_size: read_buffer_size.max(1),
        }
    }

    /// Reply to one request line
    ///
    /// Rules see the line as framed; the score ignores surrounding whitespace.
    pub fn respond(&self, line: &str) -> Reply {
        match self.rules.evaluate(line) {
            Some(message) => Reply::Rejected {
                message: message.to_string(),
                line: line.to_string(),
            },
            None => Reply::Score(scorer::score(line.trim())),
        }
    }

    /// Serve a connection until the peer closes it, logging the outcome
    pub async fn run<S>(&self, stream: S, peer: impl fmt::Display)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer = peer.to_string();
        self.metrics.record_connection_opened();
        info!("Connection established from {}", peer);

        let result = self.serve(stream, &peer).await;
        match &result {
            Ok(()) => info!("Connection closed by {}", peer),
            Err(e) => error!("Connection with {} terminated: {}", peer, e),
        }

        self.metrics.record_connection_closed(result.is_err());
    }

    /// Protocol loop; returns `Ok` when the peer closes the connection
    pub async fn serve<S>(&self, mut stream: S, peer: &str) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut latencies = LatencySamples::default();
        let result = self.exchange(&mut stream, peer, &mut latencies).await;
        self.metrics.merge_latencies(latencies);
        result
    }

    async fn exchange<S>(&self, stream: &mut S, peer: &str, latencies: &mut LatencySamples) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut lines = LineBuffer::with_capacity(self.read_buffer_size);
        let mut chunk = vec![0u8; self.read_buffer_size];

        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| Error::transport(peer, "read", e))?;

            if n == 0 {
                if !lines.is_empty() {
                    debug!(
                        "Discarding {} bytes of unterminated input from {}",
                        lines.len(),
                        peer
                    );
                }
                return Ok(());
            }

            self.metrics.record_bytes(n);

            for raw in lines.feed(&chunk[..n]) {
                let started = Instant::now();
                let line = String::from_utf8_lossy(&raw);
                let reply = self.respond(&line);

                match &reply {
                    Reply::Rejected { message, .. } => {
                        info!("Line \"{}\" from {} did not pass a rule -> {}", line, peer, message)
                    }
                    Reply::Score(score) => debug!("Line \"{}\" from {} scored {:.4}", line, peer, score),
                }

                self.metrics.record_line(reply.is_rejected());
                latencies.record(started.elapsed().as_micros() as u64);

                stream
                    .write_all(reply.encode().as_bytes())
                    .await
                    .map_err(|e| Error::transport(peer, "write", e))?;
                stream
                    .flush()
                    .await
                    .map_err(|e| Error::transport(peer, "flush", e))?;
            }
        }
    }
}

/// Listening scoring server
pub struct Server {
    listener: TcpListener,
    handler: ConnectionHandler,
    metrics: Metrics,
}

impl Server {
    /// Bind the listener and build the shared rule set
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| Error::transport(&config.listen_address, "bind", e))?;

        let rules = Arc::new(config.rule_set());
        let metrics = Metrics::new();
        info!("Loaded {} rule(s): {:?}", rules.len(), rules);

        Ok(Self {
            listener,
            handler: ConnectionHandler::new(rules, metrics.clone(), config.read_buffer_size),
            metrics,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }

    /// Handle to the counters updated by connection tasks
    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections already accepted keep running in their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Server listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                        }
                        let handler = self.handler.clone();
                        tokio::spawn(async move { handler.run(stream, peer).await });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
        }

        Ok(())
    }
}
