// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::client::{DynamoDbAdmin, TableAdmin, is_available};
use crate::config::EmulatorConfig;
use crate::error::{EmulatorError, Result};
use crate::process::EmulatorProcess;
use crate::provision::Provisioner;
use crate::readiness::{ReadinessPolicy, wait_until_ready};
use crate::reset::reset_state;
use crate::state::SessionState;
use log::{debug, info, log, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One local emulator: its configuration, its endpoint, and at most one
/// child process. Reusable across start/stop cycles.
pub struct EmulatorSession {
    config: EmulatorConfig,
    endpoint: String,
    admin: Arc<dyn TableAdmin>,
    provisioner: Provisioner,
    lifecycle: Mutex<Lifecycle>,
}

struct Lifecycle {
    state: SessionState,
    process: Option<EmulatorProcess>,
}

impl Lifecycle {
    fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!("unexpected session transition {} -> {next}", self.state);
        }
        debug!("session {} -> {next}", self.state);
        self.state = next;
    }
}

impl EmulatorSession {
    /// Session talking to the emulator through the AWS SDK.
    pub fn new(config: EmulatorConfig) -> Self {
        let endpoint = config.resolved_endpoint();
        let admin = Arc::new(DynamoDbAdmin::new(&config, &endpoint));
        Self::with_admin(config, admin)
    }

    /// Session using a caller-supplied admin client, bound to the same
    /// endpoint the config resolves to.
    pub fn with_admin(config: EmulatorConfig, admin: Arc<dyn TableAdmin>) -> Self {
        let endpoint = config.resolved_endpoint();
        let provisioner = Provisioner::new(&config);
        Self {
            config,
            endpoint,
            admin,
            provisioner,
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Created,
                process: None,
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// A fresh SDK client bound to this session's endpoint.
    pub fn dynamodb_client(&self) -> aws_sdk_dynamodb::Client {
        DynamoDbAdmin::new(&self.config, &self.endpoint)
            .client()
            .clone()
    }

    pub async fn state(&self) -> SessionState {
        self.lifecycle.lock().await.state
    }

    /// Pid of the child this session launched, if it is still owned.
    pub async fn pid(&self) -> Option<u32> {
        self.lifecycle
            .lock()
            .await
            .process
            .as_ref()
            .and_then(EmulatorProcess::pid)
    }

    pub async fn is_running(&self) -> bool {
        is_available(self.admin.as_ref()).await
    }

    /// Bring the emulator up with no tables. Returns immediately if the
    /// endpoint already answers. Concurrent calls are serialized.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;

        if self.is_running().await {
            debug!("emulator already reachable at {}", self.endpoint);
            lifecycle.transition(SessionState::Running);
            return Ok(());
        }

        if let Some(mut stale) = lifecycle.process.take() {
            warn!("previous emulator process is unreachable, stopping it");
            if let Err(e) = stale.shutdown(self.config.stop_timeout()).await {
                warn!("failed to stop unreachable emulator: {e}");
            }
            lifecycle.transition(SessionState::Stopped);
        }

        lifecycle.transition(SessionState::Provisioning);
        if let Err(e) = self.provision().await {
            lifecycle.transition(SessionState::Failed);
            return Err(e);
        }

        lifecycle.transition(SessionState::Starting);
        let process = match EmulatorProcess::spawn(&self.config) {
            Ok(process) => process,
            Err(e) => {
                lifecycle.transition(SessionState::Failed);
                return Err(e);
            }
        };
        let process = lifecycle.process.insert(process);

        let policy = ReadinessPolicy::from(&self.config);
        if let Err(e) = wait_until_ready(self.admin.as_ref(), &policy, Some(&*process)).await {
            self.abandon_start(&mut lifecycle).await;
            return Err(e);
        }

        let verbose = self.config.verbose;
        if let Err(e) = reset_state(self.admin.as_ref(), &self.endpoint, verbose).await {
            self.abandon_start(&mut lifecycle).await;
            return Err(e);
        }

        info!("DynamoDB Local running at {}", self.endpoint);
        lifecycle.transition(SessionState::Running);
        Ok(())
    }

    /// Shut down the process a failed `start` spawned and mark the session
    /// failed, so no failed session owns a live child.
    async fn abandon_start(&self, lifecycle: &mut Lifecycle) {
        if let Some(mut failed) = lifecycle.process.take()
            && let Err(stop_err) = failed.shutdown(self.config.stop_timeout()).await
        {
            warn!("failed to stop emulator after failed startup: {stop_err}");
        }
        lifecycle.transition(SessionState::Failed);
    }

    /// Make sure the jar is present, downloading it if needed. Returns
    /// whether a download happened; fails with `ArtifactMissing` if the
    /// archive did not contain the jar.
    pub async fn provision(&self) -> Result<bool> {
        if self.provisioner.ensure_downloaded().await? {
            return Ok(false);
        }
        log!(
            self.config.progress_level(),
            "DynamoDB Local not found in {}, downloading",
            self.provisioner.jar_dir().display()
        );
        self.provisioner.download().await?;
        if self.provisioner.ensure_downloaded().await? {
            Ok(true)
        } else {
            Err(EmulatorError::ArtifactMissing(self.provisioner.jar_path()))
        }
    }

    /// Wipe all tables on the session's endpoint, refusing non-local ones.
    pub async fn reset(&self) -> Result<usize> {
        reset_state(self.admin.as_ref(), &self.endpoint, self.config.verbose).await
    }

    /// Terminate the emulator this session launched and wait for it to close.
    /// Succeeds immediately if there is nothing to stop. An emulator that
    /// was already running when `start` found it is left running, but the
    /// session releases it and moves to `Stopped`.
    pub async fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(mut process) = lifecycle.process.take() else {
            if lifecycle.state.is_running() {
                info!(
                    "emulator at {} not launched by this session, leaving it running",
                    self.endpoint
                );
                lifecycle.transition(SessionState::Stopped);
            } else {
                debug!("no emulator process to stop");
            }
            return Ok(());
        };
        let status = process.shutdown(self.config.stop_timeout()).await?;
        info!("DynamoDB Local stopped ({status})");
        lifecycle.transition(SessionState::Stopped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTableAdmin;
    use crate::process::tests::fake_java;
    use crate::provision::JAR_NAME;
    use std::path::Path;

    fn config(dir: &Path) -> EmulatorConfig {
        EmulatorConfig {
            jar_dir: dir.to_path_buf(),
            endpoint: Some("http://localhost:3547".to_string()),
            download_url: "http://127.0.0.1:9/dynamodb_local_latest.tar.gz".to_string(),
            ..EmulatorConfig::default()
        }
    }

    fn refused() -> EmulatorError {
        EmulatorError::Client {
            operation: "ListTables",
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_when_already_reachable_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let jar_dir = dir.path().join("bin");
        let mut admin = MockTableAdmin::new();
        admin.expect_list_tables().times(1).returning(|| Ok(vec![]));
        admin.expect_delete_table().never();

        let session = EmulatorSession::with_admin(config(&jar_dir), Arc::new(admin));
        session.start().await.unwrap();

        assert_eq!(session.state().await, SessionState::Running);
        assert!(session.pid().await.is_none());
        assert!(!jar_dir.exists(), "nothing should be provisioned");
    }

    #[tokio::test]
    async fn test_stop_releases_adopted_emulator() {
        let dir = tempfile::tempdir().unwrap();
        let mut admin = MockTableAdmin::new();
        admin.expect_list_tables().times(1).returning(|| Ok(vec![]));

        let session = EmulatorSession::with_admin(config(dir.path()), Arc::new(admin));
        session.start().await.unwrap();
        assert_eq!(session.state().await, SessionState::Running);

        session.stop().await.unwrap();
        assert_eq!(session.state().await, SessionState::Stopped);
        assert!(session.pid().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_download_never_launches() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.java_bin = fake_java(dir.path(), "touch launched; exec sleep 60");
        let mut admin = MockTableAdmin::new();
        admin.expect_list_tables().returning(|| Err(refused()));

        let session = EmulatorSession::with_admin(cfg, Arc::new(admin));
        let err = session.start().await.unwrap_err();

        assert!(matches!(err, EmulatorError::Download { .. }), "got {err}");
        assert_eq!(session.state().await, SessionState::Failed);
        assert!(session.pid().await.is_none());
        assert!(!dir.path().join("launched").exists());
    }

    #[tokio::test]
    async fn test_spawn_error_fails_start() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(JAR_NAME), b"jar").unwrap();
        let mut cfg = config(dir.path());
        cfg.java_bin = "/nonexistent/java".to_string();
        let mut admin = MockTableAdmin::new();
        admin.expect_list_tables().returning(|| Err(refused()));

        let session = EmulatorSession::with_admin(cfg, Arc::new(admin));
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, EmulatorError::Spawn { .. }), "got {err}");
        assert_eq!(session.state().await, SessionState::Failed);
    }

    #[tokio::test]
    async fn test_premature_exit_fails_start() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(JAR_NAME), b"jar").unwrap();
        let mut cfg = config(dir.path());
        cfg.java_bin = fake_java(dir.path(), "echo 'Error: Unable to access jarfile' >&2; exit 1");
        let mut admin = MockTableAdmin::new();
        admin.expect_list_tables().returning(|| Err(refused()));

        let session = EmulatorSession::with_admin(cfg, Arc::new(admin));
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, EmulatorError::ProcessExited(_)), "got {err}");
        assert!(session.pid().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_without_process_completes() {
        let dir = tempfile::tempdir().unwrap();
        let admin = MockTableAdmin::new();
        let session = EmulatorSession::with_admin(config(dir.path()), Arc::new(admin));

        session.stop().await.unwrap();
        assert_eq!(session.state().await, SessionState::Created);
    }

    #[tokio::test]
    async fn test_remote_endpoint_reset_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.endpoint = Some("https://dynamodb.eu-west-1.amazonaws.com".to_string());
        let mut admin = MockTableAdmin::new();
        admin.expect_list_tables().never();
        admin.expect_delete_table().never();

        let session = EmulatorSession::with_admin(cfg, Arc::new(admin));
        assert!(matches!(
            session.reset().await,
            Err(EmulatorError::UnsafeEndpoint(_))
        ));
    }

    #[test]
    fn test_endpoint_fixed_at_construction() {
        let cfg = EmulatorConfig {
            port: 8123,
            endpoint: None,
            ..EmulatorConfig::default()
        };
        let session = EmulatorSession::with_admin(cfg, Arc::new(MockTableAdmin::new()));
        assert_eq!(session.endpoint(), "http://localhost:8123");
    }
}
