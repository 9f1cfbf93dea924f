// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::client::{TableAdmin, is_available};
use crate::config::EmulatorConfig;
use crate::error::{EmulatorError, Result};
use crate::process::EmulatorProcess;
use log::{debug, info};
use std::time::Duration;
use tokio::time::sleep;

pub const PROBE_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_STARTUP_WAIT: Duration = Duration::from_millis(5000);
/// Smallest step the waiter sleeps and accounts for.
const MIN_PROBE_STEP: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: PROBE_INTERVAL,
            max_wait: MAX_STARTUP_WAIT,
        }
    }
}

impl ReadinessPolicy {
    /// Sleep between probes, never zero so `waited` always advances.
    pub fn step(&self) -> Duration {
        self.interval.max(MIN_PROBE_STEP)
    }
}

impl From<&EmulatorConfig> for ReadinessPolicy {
    fn from(config: &EmulatorConfig) -> Self {
        Self {
            interval: config.probe_interval(),
            max_wait: config.startup_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// Not reachable yet; `waited` is the accumulated sleep so far.
    Waiting { waited: Duration },
    Ready,
    TimedOut { waited: Duration },
}

impl ReadinessState {
    /// Transition after one probe. The deadline is checked before sleeping
    /// again, so the last probe happens once `waited` exceeds `max_wait`.
    pub fn advance(self, reachable: bool, policy: &ReadinessPolicy) -> ReadinessState {
        match self {
            ReadinessState::Waiting { .. } if reachable => ReadinessState::Ready,
            ReadinessState::Waiting { waited } if waited > policy.max_wait => {
                ReadinessState::TimedOut { waited }
            }
            ReadinessState::Waiting { waited } => ReadinessState::Waiting {
                waited: waited.saturating_add(policy.step()),
            },
            terminal => terminal,
        }
    }
}

/// Poll until the emulator answers, the timeout passes, or the launched
/// process (if any) closes.
pub async fn wait_until_ready(
    admin: &dyn TableAdmin,
    policy: &ReadinessPolicy,
    process: Option<&EmulatorProcess>,
) -> Result<()> {
    let mut state = ReadinessState::Waiting {
        waited: Duration::ZERO,
    };
    loop {
        let reachable = is_available(admin).await;
        state = state.advance(reachable, policy);
        match state {
            ReadinessState::Ready => {
                info!("emulator is ready");
                return Ok(());
            }
            ReadinessState::TimedOut { waited } => {
                return Err(EmulatorError::StartupTimeout(waited));
            }
            ReadinessState::Waiting { waited } => {
                if let Some(status) = process.and_then(EmulatorProcess::exit_status) {
                    return Err(EmulatorError::ProcessExited(status));
                }
                debug!("emulator not ready after {}ms", waited.as_millis());
                sleep(policy.step()).await;
            }
        }
    }
}
