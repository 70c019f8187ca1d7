// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whitelist validation for every untrusted value that reaches a command
// line: printer names, upload filenames, and page selections.
//
// Values are validated against allow-lists rather than escaped; a value
// that fails here never reaches process spawn.

use crate::error::{DruckwerkError, Result};
use crate::types::DEFAULT_PRINTER_PROFILE;

/// Validate a printer name, returning it trimmed.
///
/// Rejects the empty string, the "no printer selected" sentinel, names
/// starting with `-` (which `lp -d` would parse as a flag), and any
/// character outside `[A-Za-z0-9_.-]`.  Idempotent: validating an
/// already-valid name returns it unchanged.
pub fn printer_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DruckwerkError::Validation("printer name is empty".into()));
    }
    if name == DEFAULT_PRINTER_PROFILE {
        return Err(DruckwerkError::Validation(
            "no printer profile is selected".into(),
        ));
    }
    if name.starts_with('-') {
        return Err(DruckwerkError::Validation(format!(
            "printer name '{name}' must not start with '-'"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(DruckwerkError::Validation(format!(
            "printer name '{name}' contains unsupported characters"
        )));
    }
    Ok(name.to_owned())
}

/// Validate an uploaded file's name, returning it trimmed.
///
/// Rejects path separators, `..` sequences, leading `-`, and any character
/// outside `[A-Za-z0-9_. -]`.  Traversal is rejected here outright rather
/// than relying on command-line quoting further down.
pub fn upload_filename(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DruckwerkError::Validation("filename is empty".into()));
    }
    if name.starts_with('-') {
        return Err(DruckwerkError::Validation(format!(
            "filename '{name}' must not start with '-'"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(DruckwerkError::Validation(format!(
            "filename '{name}' contains a path separator"
        )));
    }
    if name.contains("..") {
        return Err(DruckwerkError::Validation(format!(
            "filename '{name}' contains a traversal sequence"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ' ' | '-'))
    {
        return Err(DruckwerkError::Validation(format!(
            "filename '{name}' contains unsupported characters"
        )));
    }
    Ok(name.to_owned())
}

/// Validate a custom page selection, returning it with whitespace stripped.
///
/// The sanitised value must match `\d+([-,]\d+)*` — comma/dash-delimited
/// positive integers, starting and ending on a digit.
pub fn page_selection(raw: &str) -> Result<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(DruckwerkError::Validation("page selection is empty".into()));
    }

    let mut last_was_digit = false;
    for c in cleaned.chars() {
        match c {
            '0'..='9' => last_was_digit = true,
            '-' | ',' if last_was_digit => last_was_digit = false,
            _ => {
                return Err(DruckwerkError::Validation(format!(
                    "page selection '{cleaned}' is not a comma/dash list of pages"
                )));
            }
        }
    }
    if !last_was_digit {
        return Err(DruckwerkError::Validation(format!(
            "page selection '{cleaned}' ends on a separator"
        )));
    }
    Ok(cleaned)
}
