// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer diagnostics aggregation.
//
// Three status sources report the same underlying attributes in three
// incompatible wire formats.  Each source implements one capability —
// `query(printer)` — and the aggregator walks them in priority order:
//
//   1. direct IPP Get-Printer-Attributes against the local scheduler
//   2. `ipptool -X` (structured XML or property-list payload)
//   3. `ipptool` line-mode listing
//
// The first non-empty attribute map wins.  When every source comes back
// empty the aggregator falls back to the plain `lpstat -p` state line.
// A state, once found, supersedes any soft error recorded by an earlier
// source; with no state at all the most specific error is surfaced.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ipp::prelude::*;
use tracing::{debug, instrument};

use druckwerk_core::config::IPPTOOL_TEST_FILE_ENV;
use druckwerk_core::{Diagnostics, PrintConfig, PrinterProfile, SupplyEntry, SupplyLevel};

use crate::attrs::{ipp_xml, listing, plist, AttrValue, AttributeMap};
use crate::exec::run_tool;
use crate::status::{self, PRINTER_STATUS_TIMEOUT, PRINTER_STATUS_UNAVAILABLE};

/// Name of the attribute query test descriptor shipped with CUPS.
const IPPTOOL_TEST_FILE: &str = "get-printer-attributes.test";

/// Directories searched for the test descriptor when the environment
/// override is not set.
const IPPTOOL_TEST_DIRS: [&str; 2] = ["/usr/share/cups/ipptool", "/usr/local/share/cups/ipptool"];

/// One source's answer: attributes when it could query the printer, an
/// error message when it could not.  Both absent means "nothing to
/// report" (e.g. a clean but empty response).
#[derive(Debug, Default)]
pub struct SourceReply {
    pub attributes: Option<AttributeMap>,
    pub error: Option<String>,
}

impl SourceReply {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            attributes: None,
            error: Some(error.into()),
        }
    }
}

/// A prioritised printer status source.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Query one printer.  Must not panic; failures are reported through
    /// the reply, never as an Err.
    async fn query(&self, printer: &str) -> SourceReply;
}

// ---------------------------------------------------------------------------
// Source 1: direct IPP query
// ---------------------------------------------------------------------------

/// Get-Printer-Attributes via the `ipp` crate against the local scheduler.
pub struct IppSource {
    config: PrintConfig,
}

impl IppSource {
    pub fn new(config: PrintConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StatusSource for IppSource {
    fn name(&self) -> &'static str {
        "ipp"
    }

    async fn query(&self, printer: &str) -> SourceReply {
        let uri_text = self.config.printer_uri(printer);
        let Ok(uri) = uri_text.parse::<Uri>() else {
            return SourceReply::failed(PRINTER_STATUS_UNAVAILABLE);
        };

        let operation = IppOperationBuilder::get_printer_attributes(uri.clone()).build();
        let client = AsyncIppClient::new(uri);

        let response =
            match tokio::time::timeout(self.config.status_timeout(), client.send(operation)).await
            {
                Err(_) => return SourceReply::failed(PRINTER_STATUS_TIMEOUT),
                Ok(Err(e)) => {
                    debug!(uri = %uri_text, error = %e, "IPP query failed");
                    return SourceReply::failed(PRINTER_STATUS_UNAVAILABLE);
                }
                Ok(Ok(response)) => response,
            };

        if !response.header().status_code().is_success() {
            debug!(status = ?response.header().status_code(), "IPP query rejected");
            return SourceReply::failed(PRINTER_STATUS_UNAVAILABLE);
        }

        SourceReply {
            attributes: Some(flatten_ipp_attributes(response.attributes())),
            error: None,
        }
    }
}

/// Flatten all response attribute groups into one map, keeping
/// multi-valued attributes as lists.
fn flatten_ipp_attributes(attrs: &IppAttributes) -> AttributeMap {
    let mut map = AttributeMap::new();
    for group in attrs.groups() {
        for (name, attr) in group.attributes() {
            crate::attrs::insert_attr(&mut map, name.clone(), convert_ipp_value(attr.value()));
        }
    }
    map
}

fn convert_ipp_value(value: &IppValue) -> AttrValue {
    match value {
        IppValue::Array(items) => {
            AttrValue::List(items.iter().map(convert_ipp_value).collect())
        }
        IppValue::Boolean(b) => {
            AttrValue::Scalar(if *b { "true" } else { "false" }.to_owned())
        }
        other => AttrValue::Scalar(format!("{other}")),
    }
}

// ---------------------------------------------------------------------------
// Sources 2 and 3: the attribute query tool
// ---------------------------------------------------------------------------

/// `ipptool -X`: structured payload, either IPP-XML or a property list.
pub struct IpptoolSource {
    config: PrintConfig,
    test_file: Option<PathBuf>,
}

impl IpptoolSource {
    pub fn new(config: PrintConfig) -> Self {
        let test_file = locate_ipptool_test_file();
        Self { config, test_file }
    }

    /// Use an explicit test descriptor instead of the located one.
    pub fn with_test_file(config: PrintConfig, test_file: Option<PathBuf>) -> Self {
        Self { config, test_file }
    }
}

#[async_trait]
impl StatusSource for IpptoolSource {
    fn name(&self) -> &'static str {
        "ipptool-structured"
    }

    async fn query(&self, printer: &str) -> SourceReply {
        query_via_ipptool(&self.config, printer, self.test_file.as_deref(), true).await
    }
}

/// `ipptool` without `-X`: line-oriented listing output.
pub struct ListingSource {
    config: PrintConfig,
    test_file: Option<PathBuf>,
}

impl ListingSource {
    pub fn new(config: PrintConfig) -> Self {
        let test_file = locate_ipptool_test_file();
        Self { config, test_file }
    }

    /// Use an explicit test descriptor instead of the located one.
    pub fn with_test_file(config: PrintConfig, test_file: Option<PathBuf>) -> Self {
        Self { config, test_file }
    }
}

#[async_trait]
impl StatusSource for ListingSource {
    fn name(&self) -> &'static str {
        "ipptool-listing"
    }

    async fn query(&self, printer: &str) -> SourceReply {
        query_via_ipptool(&self.config, printer, self.test_file.as_deref(), false).await
    }
}

/// Find the Get-Printer-Attributes test descriptor: environment override
/// first, then the well-known CUPS data directories.
fn locate_ipptool_test_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(IPPTOOL_TEST_FILE_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    IPPTOOL_TEST_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(IPPTOOL_TEST_FILE))
        .find(|candidate| candidate.is_file())
}

async fn query_via_ipptool(
    config: &PrintConfig,
    printer: &str,
    test_file: Option<&Path>,
    structured: bool,
) -> SourceReply {
    let Some(test_file) = test_file else {
        debug!("no ipptool test descriptor found");
        return SourceReply::failed(PRINTER_STATUS_UNAVAILABLE);
    };

    let uri = config.printer_uri(printer);
    let timeout_arg = config.status_timeout_secs.to_string();
    let test_file_arg = test_file.to_string_lossy();
    let mut args: Vec<&str> = Vec::with_capacity(6);
    if structured {
        args.push("-X");
    }
    args.extend(["-T", timeout_arg.as_str(), uri.as_str(), test_file_arg.as_ref()]);

    let output = match run_tool(
        &config.tools.ipptool,
        &args,
        config.status_timeout(),
        "attribute query",
    )
    .await
    {
        Ok(output) => output,
        Err(druckwerk_core::DruckwerkError::Timeout(_)) => {
            return SourceReply::failed(PRINTER_STATUS_TIMEOUT);
        }
        Err(e) => {
            debug!(error = %e, "attribute query tool failed");
            return SourceReply::failed(PRINTER_STATUS_UNAVAILABLE);
        }
    };

    // ipptool may exit non-zero while still printing a usable payload, so
    // the payload decides before the exit status does.
    let stdout = output.stdout_text();
    let attributes = parse_ipptool_payload(&stdout, structured);
    if attributes.is_empty() {
        if output.status.success() {
            SourceReply::default()
        } else {
            let stderr = output.stderr_text();
            let detail = stderr.trim();
            SourceReply::failed(if detail.is_empty() {
                PRINTER_STATUS_UNAVAILABLE.to_owned()
            } else {
                detail.to_owned()
            })
        }
    } else {
        SourceReply {
            attributes: Some(attributes),
            error: None,
        }
    }
}

/// Pick a parser by sniffing the payload's start marker.
fn parse_ipptool_payload(stdout: &str, structured: bool) -> AttributeMap {
    if structured {
        if stdout.contains("<plist") {
            plist::parse(stdout)
        } else if stdout.contains("<ipp") {
            ipp_xml::parse(stdout)
        } else {
            AttributeMap::new()
        }
    } else {
        listing::parse(stdout)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Walks the prioritised source chain and produces the canonical
/// [`Diagnostics`] record.
pub struct DiagnosticsAggregator {
    config: PrintConfig,
    sources: Vec<Box<dyn StatusSource>>,
}

impl DiagnosticsAggregator {
    /// The default chain: direct IPP, then structured ipptool, then the
    /// line listing.
    pub fn new(config: PrintConfig) -> Self {
        let sources: Vec<Box<dyn StatusSource>> = vec![
            Box::new(IppSource::new(config.clone())),
            Box::new(IpptoolSource::new(config.clone())),
            Box::new(ListingSource::new(config.clone())),
        ];
        Self { config, sources }
    }

    /// An aggregator over an explicit source chain.
    pub fn with_sources(config: PrintConfig, sources: Vec<Box<dyn StatusSource>>) -> Self {
        Self { config, sources }
    }

    /// Collect diagnostics for the given profile.
    ///
    /// An unconfigured profile reports the generic unavailable error
    /// without querying anything.
    #[instrument(skip(self), fields(printer = %profile))]
    pub async fn collect(&self, profile: &PrinterProfile) -> Diagnostics {
        if !profile.is_configured() {
            return Diagnostics {
                printer: None,
                error: Some(PRINTER_STATUS_UNAVAILABLE.to_owned()),
                ..Diagnostics::default()
            };
        }
        let printer = profile.name();

        let mut errors: Vec<String> = Vec::new();
        let mut found: Option<AttributeMap> = None;
        for source in &self.sources {
            let reply = source.query(printer).await;
            if let Some(error) = reply.error {
                debug!(source = source.name(), error = %error, "status source failed");
                errors.push(error);
            }
            if let Some(map) = reply.attributes
                && !map.is_empty()
            {
                debug!(source = source.name(), count = map.len(), "attributes obtained");
                found = Some(map);
                break;
            }
        }

        if let Some(attributes) = found {
            let mut diagnostics = build_diagnostics(printer, &attributes);
            if diagnostics.state.is_none() {
                diagnostics.error =
                    Some(most_specific_error(&errors).unwrap_or_else(|| {
                        PRINTER_STATUS_UNAVAILABLE.to_owned()
                    }));
            }
            return diagnostics;
        }

        // No source produced attributes: fall back to the plain state line.
        let (state, state_error) = status::query_printer_state(&self.config, printer).await;
        if let Some(state) = state {
            // A state supersedes earlier soft failures.
            return Diagnostics {
                printer: Some(printer.to_owned()),
                state: Some(state),
                ..Diagnostics::default()
            };
        }
        if let Some(error) = state_error {
            errors.push(error);
        }
        Diagnostics {
            printer: Some(printer.to_owned()),
            error: most_specific_error(&errors),
            ..Diagnostics::default()
        }
    }
}

/// The first error that says more than the generic fallback, else the
/// generic fallback, else nothing when no source reported at all.
fn most_specific_error(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    errors
        .iter()
        .find(|e| e.as_str() != PRINTER_STATUS_UNAVAILABLE)
        .cloned()
        .or_else(|| Some(PRINTER_STATUS_UNAVAILABLE.to_owned()))
}

/// Build the canonical record from one attribute map, whichever parser
/// produced it.
pub fn build_diagnostics(printer: &str, attributes: &AttributeMap) -> Diagnostics {
    let state = attributes
        .get("printer-state")
        .and_then(AttrValue::first_scalar)
        .map(normalize_printer_state);
    let state_message = attributes
        .get("printer-state-message")
        .and_then(AttrValue::first_scalar)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty());

    Diagnostics {
        printer: Some(printer.to_owned()),
        state,
        state_message,
        supplies: build_supplies(attributes),
        error: None,
    }
}

/// Map `printer-state` to its human label.
///
/// Accepts the IPP enum values 3/4/5 and textual labels in any case;
/// anything else passes through raw.
pub fn normalize_printer_state(raw: &str) -> String {
    let value = raw.trim();
    match value {
        "3" => return "Idle".to_owned(),
        "4" => return "Processing".to_owned(),
        "5" => return "Stopped".to_owned(),
        _ => {}
    }
    match value.to_ascii_lowercase().as_str() {
        "idle" => "Idle".to_owned(),
        "processing" => "Processing".to_owned(),
        "stopped" => "Stopped".to_owned(),
        _ => value.to_owned(),
    }
}

/// Assemble supply entries from the parallel `marker-*` arrays, or from
/// the composite `printer-supply` attribute when no markers are present.
fn build_supplies(attributes: &AttributeMap) -> Vec<SupplyEntry> {
    let names = scalar_items(attributes, "marker-names");
    let levels = scalar_items(attributes, "marker-levels");
    let colors = scalar_items(attributes, "marker-colors");
    let kinds = scalar_items(attributes, "marker-types");
    let states = scalar_items(attributes, "marker-states");

    let count = [&names, &levels, &colors, &kinds, &states]
        .into_iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    if count > 0 {
        let mut supplies = Vec::with_capacity(count);
        for i in 0..count {
            let entry = SupplyEntry {
                name: item_at(&names, i),
                color: item_at(&colors, i),
                kind: item_at(&kinds, i),
                level: levels.get(i).map(|raw| SupplyLevel::parse(raw)),
                state: item_at(&states, i),
            };
            if !entry.is_empty() {
                supplies.push(entry);
            }
        }
        return supplies;
    }

    // `printer-supply` packs everything into `;`-separated key=value
    // segments, one attribute value per supply.
    attributes
        .get("printer-supply")
        .map(|value| {
            value
                .scalars()
                .into_iter()
                .map(supply_from_composite)
                .filter(|entry| !entry.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn scalar_items(attributes: &AttributeMap, key: &str) -> Vec<String> {
    attributes
        .get(key)
        .map(|value| value.scalars().into_iter().map(str::to_owned).collect())
        .unwrap_or_default()
}

fn item_at(items: &[String], index: usize) -> Option<String> {
    items
        .get(index)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn supply_from_composite(raw: &str) -> SupplyEntry {
    let mut entry = SupplyEntry::default();
    for segment in raw.split(';') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "name" | "markername" => entry.name = Some(value.to_owned()),
            "color" | "colorantname" => entry.color = Some(value.to_owned()),
            "type" => entry.kind = Some(value.to_owned()),
            "level" => entry.level = Some(SupplyLevel::parse(value)),
            "state" | "status" => entry.state = Some(value.to_owned()),
            _ => {}
        }
    }
    entry
}
