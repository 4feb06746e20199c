//! Access to operating system state.
//!
//! Collectors never touch the filesystem or spawn processes directly; they go
//! through [`Host`] so tests can substitute canned outputs.

use crate::error::{DaemonError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use sysinfo::System;
use tokio::process::Command;

/// Read-only view of the machine the daemon runs on.
#[async_trait]
pub trait Host: Send + Sync {
    /// Run a helper utility and return its trimmed stdout. Non-zero exit is an error.
    async fn run(&self, program: &str, args: &[&str]) -> Result<String>;

    /// Read a text file such as a `/proc` or `/sys` entry.
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// The system hostname.
    fn hostname(&self) -> Option<String>;
}

/// [`Host`] backed by the real system.
#[derive(Debug, Clone)]
pub struct LiveHost {
    command_timeout: Duration,
}

impl LiveHost {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }
}

#[async_trait]
impl Host for LiveHost {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.command_timeout, child)
            .await
            .map_err(|_| DaemonError::Timeout {
                program: program.to_string(),
                after: self.command_timeout,
            })?
            .map_err(|e| DaemonError::command_error(program, e.to_string()))?;

        if !output.status.success() {
            return Err(DaemonError::command_error(
                program,
                format!("exited with {}", output.status),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    fn hostname(&self) -> Option<String> {
        System::host_name()
    }
}
