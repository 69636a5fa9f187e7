// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use td_core::Importance;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn importance(s: &str) -> Result<Importance, String> {
    s.parse().map_err(|e: td_core::Error| e.to_string())
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "An offline-first task list that syncs with a revision-based backend")]
#[command(
    long_about = "An offline-first task list.\n\n\
    Changes apply locally first and are pushed to the configured remote. \
    Anything the remote did not acknowledge is reconciled on a later run."
)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "TD_CONFIG", value_name = "path")]
    pub config: Option<PathBuf>,

    /// Do not contact the remote for this invocation
    #[arg(long, global = true)]
    pub offline: bool,

    /// Write debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List items
    #[command(alias = "ls")]
    List {
        /// Hide completed items
        #[arg(long, short)]
        pending: bool,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Add an item
    Add {
        /// Item text
        #[arg(value_parser = non_empty_string)]
        text: String,

        #[command(flatten)]
        fields: ItemFields,
    },

    /// Change an item's text, importance, or deadline
    #[command(arg_required_else_help = true)]
    Edit {
        /// Item ID (a unique prefix is enough)
        id: String,

        /// New text
        #[arg(long, short, value_parser = non_empty_string)]
        text: Option<String>,

        #[command(flatten)]
        fields: ItemFields,

        /// Remove the deadline
        #[arg(long, conflicts_with = "deadline")]
        no_deadline: bool,
    },

    /// Mark item(s) as done
    #[command(arg_required_else_help = true)]
    Done {
        /// Item ID(s)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Mark item(s) as not done
    #[command(arg_required_else_help = true)]
    Reopen {
        /// Item ID(s)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete item(s)
    #[command(alias = "remove", arg_required_else_help = true)]
    Rm {
        /// Item ID(s)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Push all local items to the remote and adopt its answer
    Sync,

    /// Show sync status
    Status {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },
}

/// Optional item fields shared by `add` and `edit`.
#[derive(Args, Debug, Default)]
pub struct ItemFields {
    /// Importance (low, normal, high)
    #[arg(long, short, value_parser = importance)]
    pub importance: Option<Importance>,

    /// Deadline as YYYY-MM-DD
    #[arg(long, short)]
    pub deadline: Option<String>,
}
