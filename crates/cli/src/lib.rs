// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tdrs - An offline-first task list library.
//!
//! This crate provides the `td` command line front end over the td sync
//! engine: configuration loading, logging setup, and the item commands.
//!
//! # Main Components
//!
//! - [`Config`] - User configuration (data directory, remote, retry policy)
//! - [`Cli`] / [`Command`] - Parsed command line
//! - [`Error`] - Error types for all operations
//!
//! Every invocation opens the item cache, runs the startup sync check,
//! executes one command, and drops any retries that are still pending.
//! Unsynced changes stay flagged in the cache for the next run.

mod cli;
mod commands;
mod display;
mod logging;

pub mod config;
pub mod error;

pub use cli::{Cli, Command, ItemFields, OutputFormat};
pub use config::{Config, RemoteConfig, RetryConfig};
pub use error::{Error, Result};

use std::path::Path;

use commands::Session;

/// Execute a parsed command line. This is the main entry point for library
/// users and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()
            .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?,
    };
    let config = Config::load(&config_path)?;
    logging::init(&config.log_path()?, cli.verbose);
    tracing::debug!("using config {}", config_path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(cli.command, &config, &config_path, cli.offline))
}

async fn execute(
    command: Command,
    config: &Config,
    config_path: &Path,
    offline: bool,
) -> Result<()> {
    let session = Session::open(config, offline).await?;
    let result = dispatch(&session, command, config_path).await;
    session.close();
    result
}

async fn dispatch(session: &Session, command: Command, config_path: &Path) -> Result<()> {
    match command {
        Command::List { pending, output } => commands::list::run(session, pending, output),
        Command::Add { text, fields } => commands::add::run(session, &text, &fields)
            .await
            .map(|_| ()),
        Command::Edit {
            id,
            text,
            fields,
            no_deadline,
        } => commands::edit::run(session, &id, text.as_deref(), &fields, no_deadline).await,
        Command::Done { ids } => commands::lifecycle::done(session, &ids).await,
        Command::Reopen { ids } => commands::lifecycle::reopen(session, &ids).await,
        Command::Rm { ids } => commands::lifecycle::remove(session, &ids).await,
        Command::Sync => commands::sync::run(session, config_path).await,
        Command::Status { output } => commands::status::run(session, output),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
