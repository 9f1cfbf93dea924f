// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::EmulatorConfig;
use crate::error::{EmulatorError, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::retry::RetryConfig;
use aws_sdk_dynamodb::config::timeout::TimeoutConfig;
use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use log::debug;
use std::time::Duration;

const RETRY_INITIAL_BACKOFF: Duration = Duration::from_millis(50);
const RETRY_MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Administrative calls the lifecycle needs from the database API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableAdmin: Send + Sync {
    /// Names of every table on the server.
    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn delete_table(&self, name: &str) -> Result<()>;
}

/// Reachability check: true only if a list-tables call succeeds. Any error,
/// including connection refused and timeouts, means "not running".
pub async fn is_available(admin: &dyn TableAdmin) -> bool {
    match admin.list_tables().await {
        Ok(_) => true,
        Err(e) => {
            debug!("emulator not reachable: {e}");
            false
        }
    }
}

/// [`TableAdmin`] backed by the AWS SDK, bound to a single endpoint.
#[derive(Debug, Clone)]
pub struct DynamoDbAdmin {
    client: Client,
}

impl DynamoDbAdmin {
    pub fn new(config: &EmulatorConfig, endpoint: &str) -> Self {
        let retry = RetryConfig::standard()
            .with_max_attempts(config.client_max_retries.saturating_add(1))
            .with_initial_backoff(RETRY_INITIAL_BACKOFF)
            .with_max_backoff(RETRY_MAX_BACKOFF);
        let timeout = TimeoutConfig::builder()
            .operation_attempt_timeout(config.client_timeout())
            .build();
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "ddb-local",
        );
        let sdk_config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .retry_config(retry)
            .timeout_config(timeout)
            .build();
        Self {
            client: Client::from_conf(sdk_config),
        }
    }

    /// The underlying SDK client, for callers issuing their own requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl TableAdmin for DynamoDbAdmin {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start_after: Option<String> = None;
        loop {
            let page = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start_after.take())
                .send()
                .await
                .map_err(|e| EmulatorError::Client {
                    operation: "ListTables",
                    message: DisplayErrorContext(&e).to_string(),
                })?;
            names.extend(page.table_names().iter().cloned());
            match page.last_evaluated_table_name() {
                Some(last) => start_after = Some(last.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn delete_table(&self, name: &str) -> Result<()> {
        self.client
            .delete_table()
            .table_name(name)
            .send()
            .await
            .map_err(|e| EmulatorError::Client {
                operation: "DeleteTable",
                message: format!("{name}: {}", DisplayErrorContext(&e)),
            })?;
        Ok(())
    }
}
