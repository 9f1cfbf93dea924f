// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::client::TableAdmin;
use crate::error::{EmulatorError, Result};
use futures::future::try_join_all;
use crate::config::progress_level;
use log::{error, log};
use url::{Host, Url};

/// Whether `endpoint` points at this machine: `localhost` or a loopback
/// address literal. Anything unparsable counts as remote.
pub fn is_local_endpoint(endpoint: &str) -> bool {
    let Ok(url) = Url::parse(endpoint) else {
        return false;
    };
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

pub fn ensure_local_endpoint(endpoint: &str) -> Result<()> {
    if is_local_endpoint(endpoint) {
        Ok(())
    } else {
        error!("WARNING: emulator endpoint {endpoint} is not localhost, refusing to delete tables");
        Err(EmulatorError::UnsafeEndpoint(endpoint.to_string()))
    }
}

/// Delete every table on `endpoint`. Deletions run concurrently; the first
/// failure aborts the rest. Returns the number of tables deleted. Progress
/// is logged at info only when `verbose`.
pub async fn reset_state(
    admin: &dyn TableAdmin,
    endpoint: &str,
    verbose: bool,
) -> Result<usize> {
    ensure_local_endpoint(endpoint)?;
    let level = progress_level(verbose);

    let tables = admin.list_tables().await?;
    try_join_all(tables.iter().map(|name| {
        log!(level, "deleting table {name}...");
        admin.delete_table(name)
    }))
    .await?;

    if !tables.is_empty() {
        log!(level, "deleted {} table(s) on {endpoint}", tables.len());
    }
    Ok(tables.len())
}
