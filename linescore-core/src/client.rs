// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Scoring client
//!
//! The client writes a generated corpus to disk, then replays it over a single
//! connection: one line out, one reply back, strictly alternating. Accepted lines are
//! appended to the results file as `original -> score`; rejected lines are only logged.

use crate::buffer::LineBuffer;
use crate::config::{ClientConfig, GenerationConfig};
use crate::generator::{GeneratedString, StringGenerator};
use crate::protocol::Reply;
use crate::retry::ConnectRetry;
use crate::scorer::UNDEFINED_SCORE;
use crate::{Error, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Outcome of replaying a corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub sent: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Time spent from connecting to the last reply
    pub elapsed: Duration,
}

/// One request/reply connection to the scoring server
pub struct Client<S> {
    stream: S,
    peer: String,
    replies: LineBuffer,
    chunk: Vec<u8>,
}

impl Client<TcpStream> {
    /// Connect, retrying while the server refuses connections according to `retry`
    pub async fn connect(address: &str, retry: &ConnectRetry, read_buffer_size: usize) -> Result<Self> {
        let stream = retry.connect(address).await?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        info!("Connected to {}", address);
        Ok(Self::new(stream, address, read_buffer_size))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl ToString, read_buffer_size: usize) -> Self {
        let read_buffer_size = read_buffer_size.max(1);
        Self {
            stream,
            peer: peer.to_string(),
            replies: LineBuffer::with_capacity(read_buffer_size),
            chunk: vec![0u8; read_buffer_size],
        }
    }

    /// Send one line and wait for its reply
    pub async fn request(&mut self, line: &str) -> Result<Reply> {
        if line.contains('\n') {
            return Err(Error::Protocol(format!(
                "Request line cannot contain a newline: {:?}",
                line
            )));
        }

        let mut message = String::with_capacity(line.len() + 1);
        message.push_str(line);
        message.push('\n');

        self.stream
            .write_all(message.as_bytes())
            .await
            .map_err(|e| Error::transport(&self.peer, "write", e))?;
        self.stream
            .flush()
            .await
            .map_err(|e| Error::transport(&self.peer, "flush", e))?;

        let raw = self.read_reply().await?;
        Reply::parse(&String::from_utf8_lossy(&raw))
    }

    async fn read_reply(&mut self) -> Result<bytes::Bytes> {
        loop {
            if let Some(line) = self.replies.next_line() {
                return Ok(line);
            }

            let n = self
                .stream
                .read(&mut self.chunk)
                .await
                .map_err(|e| Error::transport(&self.peer, "read", e))?;

            if n == 0 {
                return Err(Error::transport(
                    &self.peer,
                    "read",
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "server closed the connection before replying",
                    ),
                ));
            }

            self.replies.extend(&self.chunk[..n]);
        }
    }

    /// Replay `corpus`, writing accepted lines to `results`
    pub async fn replay<I, W>(&mut self, corpus: I, results: &mut W) -> Result<SessionSummary>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        W: AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let mut summary = SessionSummary::default();

        for line in corpus {
            let line = line.as_ref();
            let reply = self.request(line).await?;
            summary.sent += 1;

            match reply {
                Reply::Score(score) => {
                    summary.accepted += 1;
                    if score == UNDEFINED_SCORE {
                        debug!("'{}' has no spaces, server returned the undefined score", line);
                    }
                    info!("'{}' -> {:.4}", line, score);
                    results
                        .write_all(format!("{} -> {:.4}\n", line, score).as_bytes())
                        .await?;
                }
                rejected @ Reply::Rejected { .. } => {
                    summary.rejected += 1;
                    info!("'{}'", rejected);
                }
            }
        }

        results.flush().await?;
        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}

/// Write the corpus one string per line
pub async fn write_corpus(path: impl AsRef<Path>, corpus: &[GeneratedString]) -> Result<()> {
    let file = File::create(path.as_ref()).await?;
    let mut writer = BufWriter::new(file);
    for line in corpus {
        writer.write_all(line.as_str().as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Read a corpus written by [`write_corpus`]
pub async fn read_corpus(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Generate the corpus, persist it, then replay it against the server
pub async fn run(config: &ClientConfig, generation: GenerationConfig) -> Result<SessionSummary> {
    config.validate()?;

    info!("Generating {} string(s) into {}", generation.count, config.corpus_path.display());
    let corpus = StringGenerator::new(generation)?.generate()?;
    write_corpus(&config.corpus_path, &corpus).await?;
    info!("Done creating {}", config.corpus_path.display());

    let corpus = read_corpus(&config.corpus_path).await?;

    let started = Instant::now();
    let mut client =
        Client::connect(&config.server_address, &config.connect_retry(), config.read_buffer_size).await?;
    let mut results = BufWriter::new(File::create(&config.results_path).await?);
    let mut summary = client.replay(&corpus, &mut results).await?;
    summary.elapsed = started.elapsed();

    info!(
        "Processed {} line(s): {} accepted, {} rejected, total time {:.3} s",
        summary.sent,
        summary.accepted,
        summary.rejected,
        summary.elapsed.as_secs_f64()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizeSpec;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    /// Answers each line with a canned reply
    async fn fake_server(stream: tokio::io::DuplexStream, replies: Vec<&'static str>) -> Vec<String> {
        let mut reader = BufReader::new(stream);
        let mut received = Vec::new();
        for reply in replies {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            received.push(line.trim_end_matches('\n').to_string());
            reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
        }
        received
    }

    #[tokio::test]
    async fn test_replay_writes_only_accepted_lines() {
        let (client_side, server_side) = duplex(256);
        let server = tokio::spawn(fake_server(
            server_side,
            vec!["6.0000\n", "[error] Double \"a\" rule detected >> xxaaxx\n", "-1.0000\n"],
        ));

        let mut client = Client::new(client_side, "fake", 8);
        let mut results = Vec::new();
        let summary = client
            .replay(["xx bb", "xxaaxx", "bbbb"], &mut results)
            .await
            .unwrap();

        assert_eq!(summary.sent, 3);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(
            String::from_utf8(results).unwrap(),
            "xx bb -> 6.0000\nbbbb -> -1.0000\n"
        );

        drop(client);
        assert_eq!(server.await.unwrap(), vec!["xx bb", "xxaaxx", "bbbb"]);
    }

    #[tokio::test]
    async fn test_reply_split_across_reads() {
        let (client_side, mut server_side) = duplex(256);
        let server = tokio::spawn(async move {
            let mut buf = [0u8; 16];
            let n = server_side.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"ab 12\n");
            server_side.write_all(b"7.0").await.unwrap();
            tokio::task::yield_now().await;
            server_side.write_all(b"000\n").await.unwrap();
            server_side
        });

        let mut client = Client::new(client_side, "fake", 4);
        assert_eq!(client.request("ab 12").await.unwrap(), Reply::Score(7.0));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_request_rejects_embedded_newline() {
        let (client_side, _server_side) = duplex(64);
        let mut client = Client::new(client_side, "fake", 64);
        assert!(matches!(client.request("a\nb").await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_server_hangup_is_transport_error() {
        let (client_side, server_side) = duplex(64);
        drop(server_side);
        let mut client = Client::new(client_side, "fake", 64);
        assert!(matches!(client.request("ab 12").await, Err(Error::Transport { .. })));
    }

    #[tokio::test]
    async fn test_corpus_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chains.txt");

        let corpus = StringGenerator::new(GenerationConfig {
            length: SizeSpec::Fixed(12),
            blank_spaces: SizeSpec::Fixed(2),
            count: 4,
            seed: Some(5),
        })
        .unwrap()
        .generate()
        .unwrap();

        write_corpus(&path, &corpus).await.unwrap();
        let read_back = read_corpus(&path).await.unwrap();
        let expected: Vec<String> = corpus.iter().map(|s| s.as_str().to_string()).collect();
        assert_eq!(read_back, expected);
    }
}
