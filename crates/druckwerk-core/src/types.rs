// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Druckwerk print engine.

use serde::{Deserialize, Serialize};

use crate::error::{DruckwerkError, Result};
use crate::validate;

/// Sentinel profile name meaning "no printer selected".
///
/// Stored configurations carry this literal value when the user has never
/// picked a printer, so it must never validate as a real printer name.
pub const DEFAULT_PRINTER_PROFILE: &str = "None found";

/// The active printer profile.
///
/// Loaded once per process from configuration and replaced wholesale on
/// refresh — never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterProfile {
    name: String,
}

impl PrinterProfile {
    /// Profile for a validated printer name.
    pub fn named(name: &str) -> Result<Self> {
        let name = validate::printer_name(name)?;
        Ok(Self { name })
    }

    /// The "no printer selected" profile.
    pub fn unconfigured() -> Self {
        Self {
            name: DEFAULT_PRINTER_PROFILE.to_owned(),
        }
    }

    /// Whether this profile names an actual printer.
    pub fn is_configured(&self) -> bool {
        self.name != DEFAULT_PRINTER_PROFILE
    }

    /// The profile name (the sentinel for unconfigured profiles).
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for PrinterProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Colour rendering mode passed to CUPS via `-o ColorModel=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColorMode {
    Gray,
    #[default]
    Rgb,
}

impl ColorMode {
    /// CUPS `ColorModel` option value.
    pub fn as_cups_option(&self) -> &'static str {
        match self {
            Self::Gray => "Gray",
            Self::Rgb => "RGB",
        }
    }
}

impl std::str::FromStr for ColorMode {
    type Err = DruckwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gray" | "grayscale" => Ok(Self::Gray),
            "rgb" | "color" | "colour" => Ok(Self::Rgb),
            other => Err(DruckwerkError::Validation(format!(
                "unknown colour mode '{other}'"
            ))),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// IPP `orientation-requested` enum value (RFC 8011 §5.2.10).
    pub fn ipp_enum_value(&self) -> i32 {
        match self {
            Self::Portrait => 3,
            Self::Landscape => 4,
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = DruckwerkError;

    /// Accepts the wire digits `"3"`/`"4"` used by stored settings as well
    /// as the spelled-out names.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3" | "portrait" => Ok(Self::Portrait),
            "4" | "landscape" => Ok(Self::Landscape),
            other => Err(DruckwerkError::Validation(format!(
                "unknown orientation '{other}'"
            ))),
        }
    }
}

/// Which pages of the document to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRange {
    /// The whole document.
    All,
    /// A sanitised comma/dash selection such as `1,3-5`.
    Custom(String),
}

impl PageRange {
    /// Build a custom range, sanitising and validating the selection.
    pub fn custom(selection: &str) -> Result<Self> {
        Ok(Self::Custom(validate::page_selection(selection)?))
    }

    /// Decode the stored form values: mode `"0"` is the whole document,
    /// mode `"1"` carries a custom selection.
    pub fn from_wire(mode: &str, selection: &str) -> Result<Self> {
        match mode.trim() {
            "0" => Ok(Self::All),
            "1" => Self::custom(selection),
            other => Err(DruckwerkError::Validation(format!(
                "unknown page-range mode '{other}'"
            ))),
        }
    }

    /// The custom selection, if any.
    pub fn selection(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Custom(s) => Some(s),
        }
    }
}

/// A fully validated request to print one uploaded document.
///
/// Every field is checked at construction; an invalid field aborts the job
/// before any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJobRequest {
    pub filename: String,
    pub pages: PageRange,
    pub color: ColorMode,
    pub orientation: Orientation,
}

impl PrintJobRequest {
    pub fn new(
        filename: &str,
        pages: PageRange,
        color: ColorMode,
        orientation: Orientation,
    ) -> Result<Self> {
        let filename = validate::upload_filename(filename)?;
        Ok(Self {
            filename,
            pages,
            color,
            orientation,
        })
    }
}

/// Result of a single dispatch attempt.  Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOutcome {
    /// Raw bytes the print tool wrote to stdout.
    pub stdout: Vec<u8>,
    /// Human-readable failure text, empty on success.
    pub error_text: String,
    /// Whether the tool exited successfully.
    pub succeeded: bool,
}

/// Remaining level of a consumable.
///
/// CUPS reports marker levels as strings; `"70"` becomes `Percent(70)`
/// while anything non-numeric (`"70a"`, `"unknown"`) is preserved raw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SupplyLevel {
    Percent(i64),
    Raw(String),
}

impl SupplyLevel {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Raw(trimmed.to_owned()), Self::Percent)
    }
}

/// One consumable (toner/ink cartridge) reported by the printer.
///
/// Built by zipping the parallel `marker-*` attribute arrays by index;
/// entries with no populated field at all are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<SupplyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl SupplyEntry {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.color.is_none()
            && self.kind.is_none()
            && self.level.is_none()
            && self.state.is_none()
    }
}

/// Canonical printer diagnostics record — the contract surfaced to callers.
///
/// Normally exactly one of `state` and `error` is populated; both may be
/// null when nothing could be determined and no source reported an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub printer: Option<String>,
    pub state: Option<String>,
    pub state_message: Option<String>,
    pub supplies: Vec<SupplyEntry>,
    pub error: Option<String>,
}
