// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use async_trait::async_trait;
use ddb_local::{EmulatorConfig, EmulatorError, TableAdmin};
use flate2::Compression;
use flate2::write::GzEncoder;
use nix::sys::signal;
use nix::unistd::Pid;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Marker the fake emulator creates while it is "serving".
pub const READY_MARKER: &str = "ready";
/// File the fake emulator appends one line to per launch.
pub const LAUNCH_LOG: &str = "launches";

/// A stand-in for `java` that behaves like the emulator: it records the
/// launch, becomes reachable by creating the ready marker, and removes it
/// again when terminated.
pub const FAKE_EMULATOR: &str = r#"echo "$@" >> launches
trap 'rm -f ready; exit 0' TERM
touch ready
while true; do sleep 0.1; done"#;

/// Write an executable shell script standing in for `java`.
pub fn write_fake_java(dir: &Path, body: &str) -> String {
    let path = dir.join("fake-java");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// Config pointing at `jar_dir` with a local endpoint and short timeouts.
pub fn test_config(jar_dir: &Path, java_bin: String, download_url: String) -> EmulatorConfig {
    EmulatorConfig {
        jar_dir: jar_dir.to_path_buf(),
        java_bin,
        download_url,
        endpoint: Some("http://localhost:3547".to_string()),
        probe_interval_ms: 100,
        startup_timeout_ms: 3000,
        stop_timeout_secs: 5,
        ..EmulatorConfig::default()
    }
}

/// Admin client that treats the fake emulator's ready marker as
/// reachability and keeps an in-memory table list.
pub struct MarkerAdmin {
    marker: PathBuf,
    tables: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MarkerAdmin {
    pub fn new(jar_dir: &Path, tables: &[&str]) -> Self {
        Self {
            marker: jar_dir.join(READY_MARKER),
            tables: Mutex::new(tables.iter().map(|t| t.to_string()).collect()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn tables(&self) -> Vec<String> {
        self.tables.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TableAdmin for MarkerAdmin {
    async fn list_tables(&self) -> Result<Vec<String>, EmulatorError> {
        if !self.marker.exists() {
            return Err(EmulatorError::Client {
                operation: "ListTables",
                message: "connection refused".to_string(),
            });
        }
        Ok(self.tables())
    }

    async fn delete_table(&self, name: &str) -> Result<(), EmulatorError> {
        self.tables.lock().unwrap().retain(|t| t != name);
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Build a gzip-compressed tar archive in memory.
pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Archive shaped like the real DynamoDB Local download.
pub fn emulator_archive() -> Vec<u8> {
    tar_gz(&[
        ("DynamoDBLocal.jar", &b"PK fake jar"[..]),
        ("DynamoDBLocal_lib/libsqlite4java-linux-amd64.so", &b"ELF"[..]),
        ("LICENSE.txt", &b"license"[..]),
    ])
}

/// Serve `body` with `status` (e.g. "200 OK") for every request. Returns the
/// archive URL.
pub async fn serve(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/dynamodb_local_latest.tar.gz")
}

/// A port nothing is listening on.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn launch_count(jar_dir: &Path) -> usize {
    std::fs::read_to_string(jar_dir.join(LAUNCH_LOG))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

/// Check if a PID is still alive.
pub fn pid_is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Wait until a PID is no longer alive, or timeout.
pub fn wait_for_pid_gone(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !pid_is_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
