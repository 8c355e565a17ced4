// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Metrics collection and reporting
//!
//! Counters are atomics updated once per line. Latency samples are collected by each
//! connection in its own [`LatencySamples`] and folded into the shared histogram once,
//! when the connection closes, so handling a line never waits on another connection.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Server-wide counters shared by every connection handler
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    // Connection metrics
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    connections_failed: AtomicU64,

    // Line metrics
    lines_total: AtomicU64,
    lines_rejected: AtomicU64,
    bytes_received: AtomicU64,

    // Per-line processing latency (microseconds), merged per closed connection
    line_latencies: RwLock<Vec<u64>>,
}

/// Latencies of the lines handled by one connection
#[derive(Debug, Default)]
pub struct LatencySamples {
    samples: Vec<u64>,
}

impl LatencySamples {
    pub fn record(&mut self, latency_micros: u64) {
        if self.samples.len() < MAX_LATENCY_SAMPLES {
            self.samples.push(latency_micros);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub connections_total: u64,
    pub connections_active: u64,
    pub connections_failed: u64,
    pub lines_total: u64,
    pub lines_rejected: u64,
    pub bytes_received: u64,
    pub latency_p50_micros: Option<u64>,
    pub latency_p99_micros: Option<u64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                connections_total: AtomicU64::new(0),
                connections_active: AtomicU64::new(0),
                connections_failed: AtomicU64::new(0),
                lines_total: AtomicU64::new(0),
                lines_rejected: AtomicU64::new(0),
                bytes_received: AtomicU64::new(0),
                line_latencies: RwLock::new(Vec::with_capacity(MAX_LATENCY_SAMPLES)),
            }),
        }
    }

    // Connection metrics
    pub fn record_connection_opened(&self) {
        self.inner.connections_total.fetch_add(1, Ordering::Relaxed);
        self.inner.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self, failed: bool) {
        self.inner.connections_active.fetch_sub(1, Ordering::Relaxed);
        if failed {
            self.inner.connections_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn connections_total(&self) -> u64 {
        self.inner.connections_total.load(Ordering::Relaxed)
    }

    pub fn connections_active(&self) -> u64 {
        self.inner.connections_active.load(Ordering::Relaxed)
    }

    // Line metrics
    pub fn record_bytes(&self, bytes: usize) {
        self.inner.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_line(&self, rejected: bool) {
        self.inner.lines_total.fetch_add(1, Ordering::Relaxed);
        if rejected {
            self.inner.lines_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Fold a finished connection's latencies into the histogram
    pub fn merge_latencies(&self, connection: LatencySamples) {
        if connection.is_empty() {
            return;
        }

        let mut latencies = self.inner.line_latencies.write();
        latencies.extend(connection.samples);
        if latencies.len() > MAX_LATENCY_SAMPLES {
            let excess = latencies.len() - MAX_LATENCY_SAMPLES / 2;
            latencies.drain(0..excess);
        }
    }

    pub fn lines_total(&self) -> u64 {
        self.inner.lines_total.load(Ordering::Relaxed)
    }

    pub fn lines_rejected(&self) -> u64 {
        self.inner.lines_rejected.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.inner.bytes_received.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    pub fn latency_percentile(&self, percentile: f64) -> Option<u64> {
        let latencies = self.inner.line_latencies.read();
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.clone();
        sorted.sort_unstable();
        let index = ((sorted.len() as f64 * percentile).ceil() as usize).min(sorted.len() - 1);
        Some(sorted[index])
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            connections_total: self.connections_total(),
            connections_active: self.connections_active(),
            connections_failed: self.inner.connections_failed.load(Ordering::Relaxed),
            lines_total: self.lines_total(),
            lines_rejected: self.lines_rejected(),
            bytes_received: self.bytes_received(),
            latency_p50_micros: self.latency_percentile(0.50),
            latency_p99_micros: self.latency_percentile(0.99),
        }
    }
}
