// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{EmulatorError, Result};
use log::{Level, debug};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_JAR_DIR: &str = "./tmp/bin/";
pub const DEFAULT_PORT: u16 = 0xddb; // 3547
pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://d1ni2b6xgvw0s0.cloudfront.net/v2.x/dynamodb_local_latest.tar.gz";

pub const ENV_PORT: &str = "DDB_PORT";
pub const ENV_IN_MEMORY: &str = "DDB_LOCAL_IN_MEMORY";
pub const ENV_ENDPOINT: &str = "AWS_DDB_ENDPOINT";
pub const ENV_VERBOSE: &str = "VERBOSE";
const ENV_REGION: &str = "AWS_REGION";
const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

fn default_jar_dir() -> PathBuf {
    PathBuf::from(DEFAULT_JAR_DIR)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_download_url() -> String {
    DEFAULT_DOWNLOAD_URL.to_string()
}

fn default_java_bin() -> String {
    "java".to_string()
}

fn default_region() -> String {
    "us-test-1".to_string()
}

fn default_access_key_id() -> String {
    "key".to_string()
}

fn default_secret_access_key() -> String {
    "secret".to_string()
}

fn default_client_timeout_ms() -> u64 {
    5000
}

fn default_client_max_retries() -> u32 {
    5
}

fn default_probe_interval_ms() -> u64 {
    500
}

fn default_startup_timeout_ms() -> u64 {
    5000
}

fn default_stop_timeout_secs() -> u64 {
    10
}

/// Settings for one emulator session. Resolved once (file, then environment)
/// and frozen when the session is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmulatorConfig {
    #[serde(default = "default_jar_dir")]
    pub jar_dir: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub in_memory: bool,
    /// Overrides the computed `http://localhost:<port>` endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_download_url")]
    pub download_url: String,
    #[serde(default = "default_java_bin")]
    pub java_bin: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_access_key_id")]
    pub access_key_id: String,
    #[serde(default = "default_secret_access_key")]
    pub secret_access_key: String,
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
    #[serde(default = "default_client_max_retries")]
    pub client_max_retries: u32,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            jar_dir: default_jar_dir(),
            port: default_port(),
            in_memory: true,
            endpoint: None,
            download_url: default_download_url(),
            java_bin: default_java_bin(),
            region: default_region(),
            access_key_id: default_access_key_id(),
            secret_access_key: default_secret_access_key(),
            client_timeout_ms: default_client_timeout_ms(),
            client_max_retries: default_client_max_retries(),
            probe_interval_ms: default_probe_interval_ms(),
            startup_timeout_ms: default_startup_timeout_ms(),
            stop_timeout_secs: default_stop_timeout_secs(),
            verbose: false,
        }
    }
}

impl EmulatorConfig {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Parse a YAML file, then overlay the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| EmulatorError::io(path, e))?;
        let config: EmulatorConfig = serde_yaml::from_str(&contents).map_err(|e| {
            EmulatorError::InvalidConfig(format!("parsing {}: {e}", path.display()))
        })?;
        debug!("loaded emulator config from {}", path.display());
        config.with_env_overrides()
    }

    /// Apply environment overrides. `DDB_LOCAL_IN_MEMORY` can only turn
    /// in-memory mode off; an endpoint in `AWS_DDB_ENDPOINT` wins over any
    /// configured one.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(port) = env_var(ENV_PORT) {
            self.port = port.parse().map_err(|_| {
                EmulatorError::InvalidConfig(format!("{ENV_PORT} is not a valid port: {port:?}"))
            })?;
        }
        if env_var(ENV_IN_MEMORY).is_some_and(|v| v == "false") {
            self.in_memory = false;
        }
        if let Some(endpoint) = env_var(ENV_ENDPOINT) {
            self.endpoint = Some(endpoint);
        }
        if env_var(ENV_VERBOSE).is_some() {
            self.verbose = true;
        }
        if let Some(region) = env_var(ENV_REGION) {
            self.region = region;
        }
        if let Some(key) = env_var(ENV_ACCESS_KEY_ID) {
            self.access_key_id = key;
        }
        if let Some(secret) = env_var(ENV_SECRET_ACCESS_KEY) {
            self.secret_access_key = secret;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values that would make a wait unbounded or instantly fail.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("probe_interval_ms", self.probe_interval_ms),
            ("startup_timeout_ms", self.startup_timeout_ms),
            ("client_timeout_ms", self.client_timeout_ms),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, value)| *value == 0) {
            return Err(EmulatorError::InvalidConfig(format!(
                "{name} must be greater than zero"
            )));
        }
        if self.java_bin.is_empty() {
            return Err(EmulatorError::InvalidConfig(
                "java_bin must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Level for progress messages (downloads, deletions, process exits):
    /// info when verbose, debug otherwise.
    pub fn progress_level(&self) -> Level {
        progress_level(self.verbose)
    }

    /// The endpoint clients connect to.
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

pub(crate) fn progress_level(verbose: bool) -> Level {
    if verbose { Level::Info } else { Level::Debug }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
