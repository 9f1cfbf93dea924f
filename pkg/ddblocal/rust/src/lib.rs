// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Lifecycle management for a DynamoDB Local emulator used by integration
//! tests: fetch the jar if missing, launch it, wait until it answers, wipe
//! its tables, and shut it down again.

pub mod client;
pub mod config;
pub mod error;
pub mod process;
pub mod provision;
pub mod readiness;
pub mod reset;
pub mod session;
pub mod state;

pub use client::{DynamoDbAdmin, TableAdmin};
pub use config::EmulatorConfig;
pub use error::{EmulatorError, Result};
pub use session::EmulatorSession;
pub use state::SessionState;
