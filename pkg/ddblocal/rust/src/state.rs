// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session built, never started.
    Created,
    /// Checking for or fetching the emulator artifact.
    Provisioning,
    /// Process spawned, waiting for it to answer requests.
    Starting,
    /// Reachable and reset.
    Running,
    /// Process terminated by `stop`.
    Stopped,
    /// The last `start` returned an error.
    Failed,
}

impl SessionState {
    pub fn is_running(self) -> bool {
        self == SessionState::Running
    }

    pub(crate) fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created | Stopped | Failed, Provisioning)
                | (Created | Stopped | Failed | Running, Running)
                | (Provisioning, Starting)
                | (Provisioning | Starting, Failed)
                | (Starting, Running)
                | (Running | Failed, Stopped)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Created => write!(f, "created"),
            SessionState::Provisioning => write!(f, "provisioning"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}
