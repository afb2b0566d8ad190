//! Shared harness for workspace specs.
//!
//! `Dashboard` owns temporary deploy, secret and state directories and
//! runs the daemon's real startup path in-process on an ephemeral port.
//! Requests are plain HTTP/1.1 over a `TcpStream`.

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

pub use dm_core::{RunLedger, RunStatus, ScriptId};
pub use dm_daemon::lifecycle::{self, Config, DaemonState};
pub use dm_engine::RunnerConfig;
use dm_daemon::listener::Listener;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// Runner settings that keep specs fast: scripts go through `/bin/sh`.
pub fn spec_runner() -> RunnerConfig {
    RunnerConfig::default()
        .elevate(vec!["/bin/sh".to_string()])
        .poll_interval(Duration::from_millis(10))
        .kill_grace(Duration::from_millis(200))
}

pub struct Dashboard {
    pub state: TempDir,
    pub deploy: TempDir,
    pub secrets: TempDir,
    running: Option<Running>,
}

struct Running {
    addr: SocketAddr,
    daemon: DaemonState,
    shutdown: CancellationToken,
}

impl Dashboard {
    pub fn empty() -> Self {
        Self {
            state: TempDir::new().unwrap(),
            deploy: TempDir::new().unwrap(),
            secrets: TempDir::new().unwrap(),
            running: None,
        }
    }

    pub fn config(&self, runner: RunnerConfig, auth_token: Option<&str>) -> Config {
        let mut config =
            Config::for_state_dir(self.state.path().to_path_buf(), "127.0.0.1:0".parse().unwrap(), runner);
        config.deploy_dir = self.deploy.path().to_path_buf();
        config.secret_dir = self.secrets.path().to_path_buf();
        config.auth_token = auth_token.map(str::to_string);
        config
    }

    pub async fn start(&mut self) {
        self.start_with(spec_runner(), None).await;
    }

    pub async fn start_with(&mut self, runner: RunnerConfig, auth_token: Option<&str>) {
        let config = self.config(runner, auth_token);
        let lifecycle::StartupResult { daemon, listener } = lifecycle::startup(&config).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let ctx = std::sync::Arc::clone(&daemon.ctx);
        tokio::spawn(Listener::new(listener, ctx).run(shutdown.clone()));
        self.running = Some(Running { addr, daemon, shutdown });
    }

    pub fn stop(&mut self) {
        if let Some(mut running) = self.running.take() {
            running.shutdown.cancel();
            running.daemon.shutdown().unwrap();
        }
    }

    pub fn ledger(&self) -> &dyn RunLedger {
        self.running.as_ref().unwrap().daemon.ctx.ledger.as_ref()
    }

    pub fn script(&self, id: &str, body: &str) {
        let path = self.deploy.path().join(format!("deploy_{id}.sh"));
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn remove_script(&self, id: &str) {
        std::fs::remove_file(self.deploy.path().join(format!("deploy_{id}.sh"))).unwrap();
    }

    pub fn secret(&self, name: &str, content: &str) {
        std::fs::write(self.secrets.path().join(name), content).unwrap();
    }

    pub fn ledger_file(&self) -> std::path::PathBuf {
        self.state.path().join("runs.json")
    }

    pub async fn get(&self, path: &str) -> Reply {
        self.send("GET", path, &[], "").await
    }

    pub async fn post(&self, path: &str) -> Reply {
        self.send("POST", path, &[], "").await
    }

    pub async fn send(&self, method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> Reply {
        let addr = self.running.as_ref().unwrap().addr;
        http(addr, method, path, headers, body).await
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown.cancel();
        }
    }
}

#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub head: String,
    pub body: String,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// The `data:` payloads of every pushed event, in order.
    pub fn events(&self) -> Vec<String> {
        self.body
            .split("\n\n")
            .filter(|event| !event.is_empty())
            .map(|event| {
                event.lines().map(|l| l.strip_prefix("data: ").unwrap_or(l)).collect::<Vec<_>>().join("\n")
            })
            .collect()
    }
}

async fn http(addr: SocketAddr, method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> Reply {
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
    tokio::time::timeout(Duration::from_secs(30), stream.read_to_end(&mut raw)).await.unwrap().unwrap();
    let raw = String::from_utf8_lossy(&raw).into_owned();
    let (head, rest) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    let chunked = head.to_ascii_lowercase().contains("transfer-encoding: chunked");
    let body = if chunked { dechunk(rest) } else { rest.to_string() };
    Reply { status, head: head.to_string(), body }
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

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
