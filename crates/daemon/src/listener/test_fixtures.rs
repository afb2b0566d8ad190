// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for listener tests: an in-process server on an
//! ephemeral port and a minimal HTTP/1.1 client.

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::Duration;

use dm_core::test_support::MemoryLedger;
use dm_core::{RunLedger, SystemClock};
use dm_engine::{RunnerConfig, ScriptRunner};
use dm_storage::{ScriptRegistry, SecretVault};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::{ListenCtx, Listener};

pub struct TestServer {
    pub addr: SocketAddr,
    pub ledger: Arc<MemoryLedger>,
    pub deploy: TempDir,
    pub secrets: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    pub async fn start(auth_token: Option<&str>) -> Self {
        Self::with_config(auth_token, fast_config()).await
    }

    pub async fn with_config(auth_token: Option<&str>, config: RunnerConfig) -> Self {
        let deploy = TempDir::new().unwrap();
        let secrets = TempDir::new().unwrap();
        let ledger = Arc::new(MemoryLedger::new());
        let shared: Arc<dyn RunLedger> = ledger.clone();
        let ctx = Arc::new(ListenCtx {
            runner: Arc::new(ScriptRunner::new(Arc::clone(&shared), config, SystemClock)),
            ledger: shared,
            registry: ScriptRegistry::new(deploy.path()),
            vault: SecretVault::new(secrets.path()),
            auth_token: auth_token.map(str::to_string),
        });

        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listener = Listener::new(tcp, ctx);
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(listener.run(shutdown.clone()));

        Self { addr, ledger, deploy, secrets, shutdown }
    }

    /// Write `deploy_<id>.sh` into the deploy root.
    pub fn add_script(&self, id: &str, body: &str) {
        let path = self.deploy.path().join(format!("deploy_{id}.sh"));
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn add_secret(&self, name: &str, content: &str) {
        std::fs::write(self.secrets.path().join(name), content).unwrap();
    }

    pub async fn get(&self, path: &str) -> HttpResponse {
        self.request("GET", path, &[], "").await
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> HttpResponse {
        send(self.addr, method, path, headers, body).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Scripts go through `/bin/sh` so freshly written files never hit ETXTBSY.
pub fn fast_config() -> RunnerConfig {
    RunnerConfig::default()
        .elevate(vec!["/bin/sh".to_string()])
        .poll_interval(Duration::from_millis(10))
        .kill_grace(Duration::from_millis(200))
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> HttpResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\nContent-Length: {}\r\n",
        body.len()
    );
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("\r\n");
    request.push_str(body);
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(30), stream.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();
    parse_response(&String::from_utf8_lossy(&raw))
}

fn parse_response(raw: &str) -> HttpResponse {
    let (head, rest) = raw.split_once("\r\n\r\n").unwrap();
    let mut lines = head.lines();
    let status = lines.next().unwrap().split_whitespace().nth(1).unwrap().parse().unwrap();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let chunked = headers
        .iter()
        .any(|(k, v)| k.eq_ignore_ascii_case("transfer-encoding") && v.contains("chunked"));
    let body = if chunked { dechunk(rest) } else { rest.to_string() };
    HttpResponse { status, headers, body }
}

fn dechunk(mut rest: &str) -> String {
    let mut body = String::new();
    while let Some((size, tail)) = rest.split_once("\r\n") {
        let size = usize::from_str_radix(size.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        body.push_str(&tail[..size]);
        rest = tail[size..].trim_start_matches("\r\n");
    }
    body
}
