// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ddb_local::{EmulatorConfig, EmulatorSession};
use log::info;
use std::path::PathBuf;
use tokio::signal::unix::{SignalKind, signal};

#[derive(Debug, Parser)]
#[command(name = "ddb-local", version, about = "Run and manage a local DynamoDB emulator")]
struct Cli {
    /// YAML file with emulator settings; environment variables still apply on top.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the emulator and keep it running until SIGINT or SIGTERM.
    Run,
    /// Report whether the endpoint answers requests.
    Status,
    /// Download and unpack the emulator without starting it.
    Fetch,
    /// Delete every table on the (local) endpoint.
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EmulatorConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EmulatorConfig::from_env().context("reading configuration from environment")?,
    };

    let level = if config.verbose {
        log::Level::Info
    } else {
        log::Level::Warn
    };
    simple_logger::init_with_level(level)?;

    let session = EmulatorSession::new(config);
    match cli.command {
        Command::Run => run(&session).await,
        Command::Status => {
            let running = session.is_running().await;
            println!(
                "{}: {}",
                session.endpoint(),
                if running { "running" } else { "not running" }
            );
            if !running {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Fetch => {
            let jar = session.provisioner().jar_path();
            if session.provision().await? {
                println!("downloaded: {}", jar.display());
            } else {
                println!("already present: {}", jar.display());
            }
            Ok(())
        }
        Command::Reset => {
            let deleted = session.reset().await?;
            println!("deleted {deleted} table(s) on {}", session.endpoint());
            Ok(())
        }
    }
}

async fn run(session: &EmulatorSession) -> Result<()> {
    session
        .start()
        .await
        .with_context(|| format!("starting emulator at {}", session.endpoint()))?;
    println!("DynamoDB Local listening at {}", session.endpoint());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    session.stop().await.context("stopping emulator")?;
    Ok(())
}
