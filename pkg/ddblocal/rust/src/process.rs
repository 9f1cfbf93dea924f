// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::EmulatorConfig;
use crate::error::{EmulatorError, Result};
use crate::provision::{JAR_NAME, LIB_DIR};
use crate::config::progress_level;
use log::{Level, debug, error, info, log, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

const SIGKILL_TIMEOUT: Duration = Duration::from_secs(10);

/// Arguments passed to the JVM. Relative paths resolve against the jar
/// directory, which is the child's working directory.
pub fn java_args(config: &EmulatorConfig) -> Vec<String> {
    let mut args = vec![
        format!("-Djava.library.path=./{LIB_DIR}"),
        "-jar".to_string(),
        JAR_NAME.to_string(),
        "-port".to_string(),
        config.port.to_string(),
    ];
    if config.in_memory {
        args.push("-inMemory".to_string());
    }
    args
}

/// A running emulator child. The child itself is owned by a watcher task;
/// this handle observes it through a channel that is set once the process
/// has exited and both output streams have been drained ("closed").
pub struct EmulatorProcess {
    pid: Option<u32>,
    closed: watch::Receiver<Option<ExitStatus>>,
    watcher: JoinHandle<()>,
}

impl EmulatorProcess {
    pub fn spawn(config: &EmulatorConfig) -> Result<Self> {
        let args = java_args(config);
        let mut cmd = Command::new(&config.java_bin);
        cmd.args(&args)
            .current_dir(&config.jar_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| EmulatorError::Spawn {
            command: config.java_bin.clone(),
            source,
        })?;

        let pid = child.id();
        let level = progress_level(config.verbose);
        log!(
            level,
            "[ddb-local] spawned (pid={}, cmd={} {})",
            pid.unwrap_or(0),
            config.java_bin,
            args.join(" ")
        );

        let pumps = [
            child
                .stdout
                .take()
                .map(|out| pump_lines(out, OutputStream::Stdout, config.verbose)),
            child
                .stderr
                .take()
                .map(|err| pump_lines(err, OutputStream::Stderr, config.verbose)),
        ];

        let (tx, closed) = watch::channel(None);
        let watcher = tokio::spawn(watch_child(child, pumps, tx, level));

        Ok(Self {
            pid,
            closed,
            watcher,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit status once the process has closed.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.closed.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.exit_status().is_some()
    }

    pub fn send_signal(&self, sig: Signal) {
        if self.is_closed() {
            return;
        }
        if let Some(pid) = self.pid
            && let Err(e) = signal::kill(Pid::from_raw(pid as i32), sig)
        {
            warn!("[ddb-local] failed to send {sig} to pid {pid}: {e}");
        }
    }

    /// Wait until the process has exited and its output is drained.
    pub async fn wait_closed(&mut self) -> Result<ExitStatus> {
        let status = *self
            .closed
            .wait_for(Option::is_some)
            .await
            .map_err(|_| {
                EmulatorError::ProcessControl("watcher ended without an exit status".to_string())
            })?;
        status.ok_or_else(|| EmulatorError::ProcessControl("no exit status".to_string()))
    }

    /// SIGTERM, wait up to `stop_timeout`, then SIGKILL.
    pub async fn shutdown(&mut self, stop_timeout: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status() {
            return Ok(status);
        }
        debug!("[ddb-local] sending SIGTERM");
        self.send_signal(Signal::SIGTERM);
        match timeout(stop_timeout, self.wait_closed()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "[ddb-local] stop timeout ({}s) reached, sending SIGKILL",
                    stop_timeout.as_secs()
                );
                self.send_signal(Signal::SIGKILL);
                timeout(SIGKILL_TIMEOUT, self.wait_closed())
                    .await
                    .map_err(|_| {
                        EmulatorError::ProcessControl("still running after SIGKILL".to_string())
                    })?
            }
        }
    }
}

impl Drop for EmulatorProcess {
    fn drop(&mut self) {
        // Dropping the child inside the watcher kills it (kill_on_drop).
        self.watcher.abort();
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Forward child output to the log. stderr is always reported; stdout only
/// when verbose.
fn pump_lines<R>(reader: R, stream: OutputStream, verbose: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match stream {
                    OutputStream::Stderr => error!("[ddb-local:err] {line}"),
                    OutputStream::Stdout if verbose => info!("[ddb-local] {line}"),
                    OutputStream::Stdout => {}
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("[ddb-local] failed to read {stream:?}: {e}");
                    break;
                }
            }
        }
    })
}

async fn watch_child(
    mut child: Child,
    pumps: [Option<JoinHandle<()>>; 2],
    closed: watch::Sender<Option<ExitStatus>>,
    level: Level,
) {
    let status = match child.wait().await {
        Ok(status) => status,
        Err(e) => {
            error!("[ddb-local] failed to wait on emulator: {e}");
            return;
        }
    };
    log!(level, "[ddb-local] exited with {status}");

    for pump in pumps.into_iter().flatten() {
        let _ = pump.await;
    }
    log!(level, "[ddb-local] closed");
    let _ = closed.send(Some(status));
}
