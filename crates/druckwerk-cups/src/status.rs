// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-printer status line via `lpstat -p`.
//
// `lpstat -p <name>` prints a single sentence such as
//
//   printer Office_Printer is idle.  enabled since Tue 01 Jan 2021
//
// which condenses to "Idle".  Failures keep their diagnostic text: a
// non-zero exit reports the tool's stderr verbatim, a timeout and a
// missing tool each map to a fixed message so callers can tell the three
// apart.

use tracing::instrument;

use druckwerk_core::error::DruckwerkError;
use druckwerk_core::{validate, PrintConfig};

use crate::exec::run_tool;

/// Fallback message when no status could be determined.
pub const PRINTER_STATUS_UNAVAILABLE: &str = "Printer status unavailable";

/// Message for a status query that exceeded its time bound.
pub const PRINTER_STATUS_TIMEOUT: &str = "Printer status check timed out";

/// Human-readable status of one printer.
///
/// Always returns a displayable string; error text doubles as status for
/// the UI ("lpstat: Printer not found", "Printer status check timed out").
#[instrument(skip(config))]
pub async fn printer_status(config: &PrintConfig, printer: &str) -> String {
    let Ok(printer) = validate::printer_name(printer) else {
        return PRINTER_STATUS_UNAVAILABLE.to_owned();
    };
    match query_printer_state(config, &printer).await {
        (Some(state), _) => state,
        (None, Some(error)) => error,
        (None, None) => PRINTER_STATUS_UNAVAILABLE.to_owned(),
    }
}

/// Raw state query used by both [`printer_status`] and the diagnostics
/// fallback: `(state, error)`, at most one populated.
pub(crate) async fn query_printer_state(
    config: &PrintConfig,
    printer: &str,
) -> (Option<String>, Option<String>) {
    let result = run_tool(
        &config.tools.lpstat,
        &["-p", printer],
        config.status_timeout(),
        "printer status check",
    )
    .await;

    match result {
        Ok(output) if output.status.success() => {
            match parse_status_line(&output.stdout_text(), printer) {
                Some(state) => (Some(state), None),
                None => (None, None),
            }
        }
        Ok(output) => {
            let stderr = output.stderr_text();
            let stdout = output.stdout_text();
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or(PRINTER_STATUS_UNAVAILABLE)
                .to_owned();
            (None, Some(detail))
        }
        Err(DruckwerkError::Timeout(_)) => (None, Some(PRINTER_STATUS_TIMEOUT.to_owned())),
        Err(_) => (None, Some(PRINTER_STATUS_UNAVAILABLE.to_owned())),
    }
}

/// Condense the `lpstat -p` sentence into a short label.
///
/// Strips the `printer <name>` prefix, truncates at the first sentence
/// terminator, drops a leading "is ", and capitalizes the first letter.
fn parse_status_line(stdout: &str, printer: &str) -> Option<String> {
    let line = stdout.lines().find(|l| !l.trim().is_empty())?.trim();

    let mut rest = line.strip_prefix("printer").unwrap_or(line).trim_start();
    rest = rest.strip_prefix(printer).unwrap_or(rest).trim_start();
    let sentence = rest.split('.').next().unwrap_or(rest).trim();
    let sentence = sentence.strip_prefix("is ").unwrap_or(sentence).trim();
    if sentence.is_empty() {
        return None;
    }

    let mut chars = sentence.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().collect::<String>() + chars.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condenses_the_idle_sentence() {
        let line = "printer Office_Printer is idle.  enabled since Tue 01 Jan 2021 10:00:00 AM";
        assert_eq!(
            parse_status_line(line, "Office_Printer").as_deref(),
            Some("Idle")
        );
    }

    #[test]
    fn keeps_states_that_do_not_start_with_is() {
        let line = "printer Office_Printer disabled since Tue 01 Jan 2021 -";
        assert_eq!(
            parse_status_line(line, "Office_Printer").as_deref(),
            Some("Disabled since Tue 01 Jan 2021 -")
        );
    }

    #[test]
    fn empty_output_gives_no_state() {
        assert_eq!(parse_status_line("", "Office_Printer"), None);
        assert_eq!(parse_status_line("\n  \n", "Office_Printer"), None);
    }

    #[cfg(unix)]
    mod with_fake_lpstat {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_tool(dir: &std::path::Path, body: &str) -> String {
            let path = dir.join("fake-lpstat");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
            path.to_string_lossy().into_owned()
        }

        fn config_with(lpstat: String) -> PrintConfig {
            PrintConfig {
                status_timeout_secs: 1,
                tools: druckwerk_core::config::ToolConfig {
                    lpstat,
                    ..Default::default()
                },
                ..PrintConfig::default()
            }
        }

        #[tokio::test]
        async fn parses_idle_status() {
            let dir = tempfile::tempdir().expect("tempdir");
            let lpstat = fake_tool(
                dir.path(),
                "echo 'printer Office_Printer is idle.  enabled since Tue 01 Jan 2021'",
            );
            let status = printer_status(&config_with(lpstat), "Office_Printer").await;
            assert_eq!(status, "Idle");
        }

        #[tokio::test]
        async fn returns_error_output_verbatim() {
            let dir = tempfile::tempdir().expect("tempdir");
            let lpstat = fake_tool(
                dir.path(),
                "echo 'lpstat: Printer not found' >&2\nexit 1",
            );
            let status = printer_status(&config_with(lpstat), "Missing_Printer").await;
            assert_eq!(status, "lpstat: Printer not found");
        }

        #[tokio::test]
        async fn reports_timeouts_distinctly() {
            let dir = tempfile::tempdir().expect("tempdir");
            let lpstat = fake_tool(dir.path(), "sleep 5");
            let status = printer_status(&config_with(lpstat), "Office_Printer").await;
            assert_eq!(status, PRINTER_STATUS_TIMEOUT);
        }

        #[tokio::test]
        async fn missing_tool_is_unavailable_not_timeout() {
            let status = printer_status(
                &config_with("druckwerk-no-such-lpstat".into()),
                "Office_Printer",
            )
            .await;
            assert_eq!(status, PRINTER_STATUS_UNAVAILABLE);
        }
    }
}
