// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! End-to-end tests against a real server on an ephemeral port

use linescore_core::client::{self, Client};
use linescore_core::config::{ClientConfig, GenerationConfig, ServerConfig, SizeSpec};
use linescore_core::metrics::Metrics;
use linescore_core::protocol::Reply;
use linescore_core::retry::ConnectRetry;
use linescore_core::server::Server;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const DOUBLE_A: &str = "Double \"a\" rule detected";

struct TestServer {
    addr: SocketAddr,
    metrics: Metrics,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<linescore_core::Result<()>>,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Self {
        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let metrics = server.metrics();
        let (shutdown, rx) = oneshot::channel();
        let handle = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            addr,
            metrics,
            shutdown,
            handle,
        }
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }
}

fn ephemeral_config() -> ServerConfig {
    ServerConfig {
        listen_address: "127.0.0.1:0".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_default_rules_over_tcp() {
    let server = TestServer::start(ephemeral_config()).await;
    let mut client = Client::connect(&server.addr.to_string(), &ConnectRetry::once(), 1024)
        .await
        .unwrap();

    assert_eq!(
        client.request("xxaaxx").await.unwrap(),
        Reply::Rejected {
            message: DOUBLE_A.to_string(),
            line: "xxaaxx".to_string(),
        }
    );
    assert_eq!(client.request("xx bb").await.unwrap(), Reply::Score(6.0));
    assert_eq!(client.request("ab 12").await.unwrap(), Reply::Score(7.0));
    assert_eq!(client.request("bbbb").await.unwrap(), Reply::Score(-1.0));

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_raw_wire_format_and_batched_lines() {
    let server = TestServer::start(ephemeral_config()).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    stream.write_all(b"xxaaxx\nxx bb\nab").await.unwrap();
    stream.write_all(b" 12\n").await.unwrap();

    let mut reader = BufReader::new(stream);
    let mut replies = Vec::new();
    for _ in 0..3 {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        replies.push(line);
    }

    assert_eq!(
        replies,
        vec![
            format!("[error] {} >> xxaaxx\n", DOUBLE_A),
            "6.0000\n".to_string(),
            "7.0000\n".to_string(),
        ]
    );

    drop(reader);
    server.stop().await;
}

#[tokio::test]
async fn test_connections_are_independent() {
    let server = TestServer::start(ephemeral_config()).await;
    let addr = server.addr.to_string();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let addr = addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut client = Client::connect(&addr, &ConnectRetry::once(), 64).await.unwrap();
            let mut scores = Vec::new();
            for j in 0..20 {
                let line = format!("c{} l{}", i, j);
                match client.request(&line).await.unwrap() {
                    Reply::Score(score) => scores.push(score),
                    other => panic!("unexpected reply {:?}", other),
                }
            }
            scores
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let scores = task.await.unwrap();
        assert_eq!(scores.len(), 20);
        for (j, score) in scores.into_iter().enumerate() {
            let line = format!("c{} l{}", i, j);
            assert_eq!(score, linescore_core::scorer::score(&line));
        }
    }

    assert_eq!(server.metrics.lines_total(), 160);
    assert_eq!(server.metrics.connections_total(), 8);
    server.stop().await;
}

#[tokio::test]
async fn test_client_run_end_to_end() {
    let server = TestServer::start(ephemeral_config()).await;
    let dir = tempfile::tempdir().unwrap();

    let config = ClientConfig {
        server_address: server.addr.to_string(),
        corpus_path: dir.path().join("chains.txt"),
        results_path: dir.path().join("results.txt"),
        max_retries: 1,
        ..Default::default()
    };
    let generation = GenerationConfig {
        length: SizeSpec::Range { min: 10, max: 30 },
        blank_spaces: SizeSpec::Range { min: 1, max: 3 },
        count: 50,
        seed: Some(2024),
    };

    let summary = client::run(&config, generation).await.unwrap();
    assert_eq!(summary.sent, 50);
    assert_eq!(summary.accepted + summary.rejected, 50);

    let corpus = client::read_corpus(&config.corpus_path).await.unwrap();
    let results = tokio::fs::read_to_string(&config.results_path).await.unwrap();
    let result_lines: Vec<&str> = results.lines().collect();
    assert_eq!(result_lines.len(), summary.accepted);

    let accepted: Vec<&String> = corpus
        .iter()
        .filter(|line| !line.to_lowercase().contains("aa"))
        .collect();
    assert_eq!(accepted.len(), summary.accepted);
    for (line, result) in accepted.iter().zip(&result_lines) {
        let expected = format!("{} -> {:.4}", line, linescore_core::scorer::score(line));
        assert_eq!(*result, expected);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_infeasible_generation_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig {
        // Nothing listens here; the run must fail on generation first.
        server_address: "127.0.0.1:9".to_string(),
        corpus_path: dir.path().join("chains.txt"),
        results_path: dir.path().join("results.txt"),
        max_retries: 1,
        ..Default::default()
    };
    let generation = GenerationConfig {
        length: SizeSpec::Fixed(6),
        blank_spaces: SizeSpec::Fixed(3),
        count: 5,
        seed: Some(1),
    };

    let err = client::run(&config, generation).await.unwrap_err();
    assert!(err.is_infeasible());
    assert!(!config.corpus_path.exists());
}
