// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer enumeration via the CUPS listing tool.
//
// `lpstat -a` prints one destination per line, e.g.
//
//   Office_Printer accepting requests since Tue 01 Jan 2021 10:00:00 AM
//
// The token before " accepting" is the printer name.  Discovery failure is
// non-fatal: callers must treat an empty list as "unknown", never as "no
// printers exist".

use tracing::{debug, instrument, warn};

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::{validate, PrintConfig};

use crate::exec::run_tool;

/// Enumerate the printers known to the local printing subsystem.
///
/// Any failure — missing tool, non-zero exit, timeout — yields an empty
/// list.
#[instrument(skip(config))]
pub async fn list_printers(config: &PrintConfig) -> Vec<String> {
    match query_printers(config).await {
        Ok(printers) => {
            debug!(count = printers.len(), "printer discovery complete");
            printers
        }
        Err(e) => {
            warn!(error = %e, "printer discovery failed");
            Vec::new()
        }
    }
}

async fn query_printers(config: &PrintConfig) -> Result<Vec<String>> {
    let output = run_tool(
        &config.tools.lpstat,
        &["-a"],
        config.status_timeout(),
        "printer discovery",
    )
    .await?;

    if !output.status.success() {
        let detail = output.stderr_text();
        let detail = detail.trim();
        return Err(DruckwerkError::ProcessFailure(if detail.is_empty() {
            "lpstat -a exited with an error".into()
        } else {
            detail.to_owned()
        }));
    }

    Ok(parse_printer_listing(&output.stdout_text()))
}

/// Extract printer names from `lpstat -a` output, deduplicated in
/// first-seen order.  Lines that do not yield a valid printer name are
/// skipped.
fn parse_printer_listing(stdout: &str) -> Vec<String> {
    let mut printers: Vec<String> = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let candidate = line.split(" accepting").next().unwrap_or(line);
        match validate::printer_name(candidate) {
            Ok(name) => {
                if !printers.contains(&name) {
                    printers.push(name);
                }
            }
            Err(_) => {
                debug!(line, "skipping unparseable listing line");
            }
        }
    }
    printers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_name_per_line() {
        let listing = "Office_Printer accepting requests since Tue 01 Jan 2021\n\
                       Lab_Printer accepting requests since Wed 02 Jan 2021\n";
        assert_eq!(
            parse_printer_listing(listing),
            vec!["Office_Printer", "Lab_Printer"]
        );
    }

    #[test]
    fn deduplicates_preserving_first_seen_order() {
        let listing = "B_Printer accepting requests\n\
                       A_Printer accepting requests\n\
                       B_Printer accepting requests\n";
        assert_eq!(parse_printer_listing(listing), vec!["B_Printer", "A_Printer"]);
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let listing = "\n\
                       system default destination: Office_Printer is odd here\n\
                       Office_Printer accepting requests since Tue\n";
        assert_eq!(parse_printer_listing(listing), vec!["Office_Printer"]);
    }

    #[tokio::test]
    async fn missing_tool_yields_empty_list() {
        let config = PrintConfig {
            tools: druckwerk_core::config::ToolConfig {
                lpstat: "druckwerk-no-such-lpstat".into(),
                ..Default::default()
            },
            ..PrintConfig::default()
        };
        assert!(list_printers(&config).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_yields_empty_list() {
        let config = PrintConfig {
            tools: druckwerk_core::config::ToolConfig {
                lpstat: "false".into(),
                ..Default::default()
            },
            ..PrintConfig::default()
        };
        assert!(list_printers(&config).await.is_empty());
    }
}
