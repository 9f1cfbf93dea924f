// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::{EmulatorConfig, progress_level};
use crate::error::{EmulatorError, Result};
use flate2::read::GzDecoder;
use log::{debug, log, warn};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Jar the archive unpacks to; also the `-jar` argument at launch.
pub const JAR_NAME: &str = "DynamoDBLocal.jar";
/// Native library directory shipped next to the jar.
pub const LIB_DIR: &str = "DynamoDBLocal_lib";

const FALLBACK_ARCHIVE_NAME: &str = "dynamodb_local_latest.tar.gz";

/// Fetches and unpacks the emulator archive into the jar directory.
#[derive(Debug, Clone)]
pub struct Provisioner {
    jar_dir: PathBuf,
    download_url: String,
    verbose: bool,
    http: reqwest::Client,
}

impl Provisioner {
    pub fn new(config: &EmulatorConfig) -> Self {
        Self {
            jar_dir: config.jar_dir.clone(),
            download_url: config.download_url.clone(),
            verbose: config.verbose,
            http: reqwest::Client::new(),
        }
    }

    pub fn jar_dir(&self) -> &Path {
        &self.jar_dir
    }

    pub fn jar_path(&self) -> PathBuf {
        self.jar_dir.join(JAR_NAME)
    }

    /// Local copy of the archive, named after the last URL path segment.
    pub fn archive_path(&self) -> PathBuf {
        let name = Url::parse(&self.download_url)
            .ok()
            .and_then(|url| {
                url.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_ARCHIVE_NAME.to_string());
        self.jar_dir.join(name)
    }

    /// Whether the jar is present. Creates the jar directory if it is
    /// missing; only a failure to create it is an error.
    pub async fn ensure_downloaded(&self) -> Result<bool> {
        if tokio::fs::metadata(&self.jar_dir).await.is_err() {
            debug!("creating jar directory {}", self.jar_dir.display());
            tokio::fs::create_dir_all(&self.jar_dir)
                .await
                .map_err(|e| EmulatorError::io(&self.jar_dir, e))?;
            tokio::fs::metadata(&self.jar_dir)
                .await
                .map_err(|e| EmulatorError::io(&self.jar_dir, e))?;
        }
        Ok(tokio::fs::metadata(self.jar_path())
            .await
            .is_ok_and(|m| m.is_file()))
    }

    /// Stream the archive to disk, then extract it. A partially written
    /// archive is removed so the next attempt starts clean.
    pub async fn download(&self) -> Result<()> {
        let archive = self.archive_path();
        if let Err(e) = self.fetch_archive(&archive).await {
            if let Err(rm) = tokio::fs::remove_file(&archive).await
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                warn!("failed to remove partial archive {}: {rm}", archive.display());
            }
            return Err(e);
        }
        log!(
            progress_level(self.verbose),
            "downloaded DynamoDB Local to {}",
            archive.display()
        );
        self.extract().await
    }

    async fn fetch_archive(&self, archive: &Path) -> Result<u64> {
        let download_err = |e: reqwest::Error| EmulatorError::Download {
            url: self.download_url.clone(),
            message: e.to_string(),
        };

        debug!("fetching {}", self.download_url);
        let mut response = self
            .http
            .get(&self.download_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(download_err)?;

        let mut file = tokio::fs::File::create(archive)
            .await
            .map_err(|e| EmulatorError::io(archive, e))?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(download_err)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| EmulatorError::io(archive, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| EmulatorError::io(archive, e))?;
        debug!("wrote {written} bytes to {}", archive.display());
        Ok(written)
    }

    /// Gunzip and unpack the archive into the jar directory, keeping the
    /// archive's internal paths.
    pub async fn extract(&self) -> Result<()> {
        let archive = self.archive_path();
        let dest = self.jar_dir.clone();
        let archive_for_task = archive.clone();
        tokio::task::spawn_blocking(move || unpack(&archive_for_task, &dest))
            .await
            .map_err(|e| EmulatorError::Extract {
                archive: archive.clone(),
                source: std::io::Error::other(e),
            })?
            .map_err(|source| EmulatorError::Extract {
                archive: archive.clone(),
                source,
            })?;
        debug!("extracted {} into {}", archive.display(), self.jar_dir.display());
        Ok(())
    }
}

fn unpack(archive: &Path, dest: &Path) -> std::io::Result<()> {
    let file = std::fs::File::open(archive)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.unpack(dest)
}
