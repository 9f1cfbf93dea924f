// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the emulator lifecycle. Each variant names the stage that failed.
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download {url}: {message}")]
    Download { url: String, message: String },

    #[error("failed to extract {}: {source}", archive.display())]
    Extract {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("emulator artifact missing after provisioning: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("emulator process control failed: {0}")]
    ProcessControl(String),

    #[error("emulator process exited before becoming ready ({0})")]
    ProcessExited(ExitStatus),

    #[error("timed out after {}ms waiting for emulator startup", .0.as_millis())]
    StartupTimeout(Duration),

    #[error(
        "refusing destructive operation: endpoint {0} is not localhost, risk of data loss"
    )]
    UnsafeEndpoint(String),

    #[error("{operation} failed: {message}")]
    Client {
        operation: &'static str,
        message: String,
    },
}

impl EmulatorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EmulatorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = EmulatorError> = std::result::Result<T, E>;
