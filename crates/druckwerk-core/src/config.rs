// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ColorMode, Orientation};

/// Environment variable overriding where the ipptool test descriptor
/// (`get-printer-attributes.test`) is looked up.
pub const IPPTOOL_TEST_FILE_ENV: &str = "DRUCKWERK_IPPTOOL_TEST";

/// External binaries the engine shells out to.
///
/// Names are configuration, not hard-coded: deployments may point these at
/// absolute paths or wrapper scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// CUPS listing/status tool.
    pub lpstat: String,
    /// CUPS print submission tool.
    pub lp: String,
    /// CUPS attribute query tool.
    pub ipptool: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            lpstat: "lpstat".into(),
            lp: "lp".into(),
            ipptool: "ipptool".into(),
        }
    }
}

/// Persistent engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintConfig {
    /// Trusted root directory all print-source files must resolve inside.
    pub uploads_dir: PathBuf,
    /// Explicitly configured printer name, if the user has picked one.
    pub printer_profile: Option<String>,
    /// Colour mode applied to new jobs.
    pub default_color: ColorMode,
    /// Orientation applied to new jobs.
    pub default_orientation: Orientation,
    /// External tool binaries.
    pub tools: ToolConfig,
    /// Host of the local CUPS scheduler, used for IPP attribute queries.
    pub cups_host: String,
    /// Port of the local CUPS scheduler.
    pub cups_port: u16,
    /// Hard bound on status/discovery queries, in seconds.
    pub status_timeout_secs: u64,
    /// Bound on a single dispatch attempt, in seconds.  The reference
    /// behaviour this engine replaces had no dispatch bound; expiry is
    /// reported as a retryable timeout.
    pub dispatch_timeout_secs: u64,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            printer_profile: None,
            default_color: ColorMode::Rgb,
            default_orientation: Orientation::Portrait,
            tools: ToolConfig::default(),
            cups_host: "localhost".into(),
            cups_port: 631,
            status_timeout_secs: 5,
            dispatch_timeout_secs: 60,
        }
    }
}

impl PrintConfig {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    /// IPP URI of a named printer on the local scheduler.
    pub fn printer_uri(&self, printer: &str) -> String {
        format!(
            "ipp://{}:{}/printers/{}",
            self.cups_host, self.cups_port, printer
        )
    }
}
