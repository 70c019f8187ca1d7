// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded subprocess execution shared by discovery, status, and the
// diagnostics providers.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use druckwerk_core::error::{DruckwerkError, Result};

/// Captured output of one finished tool invocation.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: std::process::ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `program` with `args`, bounded by `timeout`.
///
/// `what` names the operation in `Timeout` errors (e.g. "printer status
/// check").  A missing binary maps to `ToolUnavailable`; on timeout the
/// child is killed rather than left running.
pub(crate) async fn run_tool(
    program: &str,
    args: &[&str],
    timeout: Duration,
    what: &str,
) -> Result<ToolOutput> {
    debug!(program, ?args, "running tool");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DruckwerkError::ToolUnavailable(program.to_owned()),
            _ => DruckwerkError::Io(e),
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| DruckwerkError::Timeout(what.to_owned()))??;

    Ok(ToolOutput {
        status: output.status,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_tool_unavailable() {
        let result = run_tool(
            "druckwerk-no-such-binary",
            &[],
            Duration::from_secs(1),
            "test run",
        )
        .await;
        assert!(matches!(result, Err(DruckwerkError::ToolUnavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_tool_times_out() {
        let result = run_tool("sleep", &["5"], Duration::from_millis(50), "test run").await;
        assert!(matches!(result, Err(DruckwerkError::Timeout(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_exit_status() {
        let output = run_tool("echo", &["hello"], Duration::from_secs(5), "test run")
            .await
            .expect("echo runs");
        assert!(output.status.success());
        assert_eq!(output.stdout_text().trim(), "hello");
    }
}
