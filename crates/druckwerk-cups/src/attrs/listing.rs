// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-oriented attribute listing parser.
//
// The listing tools print one attribute per line in either of two shapes:
//
//   printer-state (enum) = 4
//   printer-state-message: Ready to print.
//
// Values may carry a trailing comma (set continuation) and matching
// surrounding quotes.  Repeated keys accumulate into a list in encounter
// order.  Banner lines, test names, and PASS/FAIL summaries do not look
// like attributes and are skipped.

use super::{insert_attr, is_attribute_name, AttrValue, AttributeMap};

/// Parse a line listing into an attribute map.  Total: unusable lines are
/// skipped, never fatal.
pub fn parse(input: &str) -> AttributeMap {
    let mut map = AttributeMap::new();
    for line in input.lines() {
        if let Some((key, value)) = parse_line(line) {
            insert_attr(&mut map, key, AttrValue::Scalar(value));
        }
    }
    map
}

/// Split one line into an attribute name and cleaned value.
fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (raw_key, raw_value) = if let Some((key, value)) = line.split_once('=') {
        (key, value)
    } else {
        line.split_once(':')?
    };

    let key = strip_key_annotation(raw_key);
    if !is_attribute_name(&key) {
        return None;
    }

    let value = clean_value(raw_value);
    if value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Trim an optional `(type)` annotation from the key.
fn strip_key_annotation(raw: &str) -> String {
    let raw = raw.trim();
    match raw.split_once('(') {
        Some((name, _)) => name.trim().to_owned(),
        None => raw.to_owned(),
    }
}

/// Trim whitespace, one trailing comma, and matching surrounding quotes.
fn clean_value(raw: &str) -> String {
    let mut value = raw.trim();
    value = value.strip_suffix(',').unwrap_or(value).trim_end();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            value = &value[1..value.len() - 1];
            break;
        }
    }
    value.to_owned()
}
