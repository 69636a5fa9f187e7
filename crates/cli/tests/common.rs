// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// A temp directory holding a config file and the data directory it points at.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// Local-only workspace: no `[remote]` section.
    pub fn local() -> Self {
        Self::with_config("")
    }

    /// Workspace whose remote refuses every connection.
    pub fn unreachable_remote() -> Self {
        Self::with_config(
            "[remote]\nurl = \"http://127.0.0.1:9/todo\"\ntoken = \"t\"\ntimeout_secs = 2\n",
        )
    }

    pub fn with_config(extra: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        let config = format!("data_dir = {:?}\n{}", data_dir.display().to_string(), extra);
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        Workspace { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("data").join("td.log")
    }

    /// A `td` command bound to this workspace's config.
    pub fn td(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("td");
        cmd.env_remove("RUST_LOG")
            .env("TD_CONFIG", self.config_path());
        cmd
    }

    /// Adds an item and returns its short id.
    pub fn add(&self, text: &str) -> String {
        let output = self.td().arg("add").arg(text).output().unwrap();
        assert!(output.status.success(), "add failed: {:?}", output);
        String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .nth(1)
            .unwrap()
            .trim_end_matches(':')
            .to_string()
    }

    pub fn list(&self) -> String {
        let output = self.td().arg("list").output().unwrap();
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}
