// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Connecting to the scoring server with backoff
//!
//! Only the initial connect is retried. Once a session is running, a transport error
//! ends it: a line already written cannot be matched to a reply after a reconnect.

use crate::{Error, Result};
use rand::Rng;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{info, warn};

/// How often and how patiently the client tries to reach the server
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectRetry {
    /// Connection attempts, the first one included
    pub attempts: u32,
    /// Wait after the first failed attempt; doubles after every further failure
    pub initial_delay: Duration,
    /// Upper bound for the doubled wait, before jitter
    pub max_delay: Duration,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ConnectRetry {
    /// A single attempt; any connect error fails immediately
    pub fn once() -> Self {
        Self {
            attempts: 1,
            ..Default::default()
        }
    }

    /// Wait before attempt `failed + 1`, with up to 25% random jitter added
    pub fn delay_after(&self, failed: u32) -> Duration {
        let doublings = failed.saturating_sub(1).min(16);
        let base = self
            .initial_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay);

        let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis() / 4);
        base + Duration::from_millis(jitter_ms as u64)
    }

    /// Open a TCP connection to `address`
    ///
    /// Refused, reset or timed out attempts are retried until `attempts` is used up.
    /// Any other error, such as an unresolvable host, is returned at once.
    pub async fn connect(&self, address: &str) -> Result<TcpStream> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            match TcpStream::connect(address).await {
                Ok(stream) => {
                    if attempt > 1 {
                        info!("Reached server {} on attempt {}/{}", address, attempt, attempts);
                    }
                    return Ok(stream);
                }
                Err(e) if attempt < attempts && server_not_ready(&e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Server {} not reachable ({}), attempt {}/{}; next try in {:?}",
                        address, e, attempt, attempts, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!("Giving up on server {} after {} attempt(s)", address, attempt);
                    }
                    return Err(Error::transport(address, "connect", e));
                }
            }
        }
    }
}

/// Failures a server that is still starting up, or restarting, produces
fn server_not_ready(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn unused_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let retry = ConnectRetry {
            attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };

        let first = retry.delay_after(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));

        let second = retry.delay_after(2);
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(250));

        for failed in 3..40 {
            let capped = retry.delay_after(failed);
            assert!(capped >= Duration::from_millis(350));
            assert!(capped <= Duration::from_millis(437));
        }
    }

    #[test]
    fn test_only_unready_server_errors_are_retried() {
        assert!(server_not_ready(&io::Error::from(io::ErrorKind::ConnectionRefused)));
        assert!(server_not_ready(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!server_not_ready(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!server_not_ready(&io::Error::from(io::ErrorKind::InvalidInput)));
    }

    #[tokio::test]
    async fn test_connect_to_listening_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let stream = ConnectRetry::once().connect(&addr).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap().to_string(), addr);
    }

    #[tokio::test]
    async fn test_refused_after_all_attempts() {
        let addr = unused_address().await;
        let retry = ConnectRetry {
            attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        };

        match retry.connect(&addr).await {
            Err(Error::Transport { peer, operation, source }) => {
                assert_eq!(peer, addr);
                assert_eq!(operation, "connect");
                assert_eq!(source.kind(), io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_server_started_late_is_reached() {
        let addr = unused_address().await;
        let late = addr.clone();
        let server = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            let listener = TcpListener::bind(&late).await.unwrap();
            listener.accept().await.unwrap();
        });

        let retry = ConnectRetry {
            attempts: 20,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(40),
        };
        retry.connect(&addr).await.unwrap();
        server.await.unwrap();
    }
}
