// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Uniform attribute mapping produced by the three wire-format parsers.
//
// Each parser is a total function from payload text to an `AttributeMap`;
// malformed input yields an empty (or partial) map, never an error.  The
// aggregator consuming these maps never needs to know which parser
// produced them.

use std::collections::BTreeMap;

pub mod ipp_xml;
pub mod listing;
pub mod plist;

/// One parsed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Scalar(String),
    /// Ordered multi-value attribute, multiplicity preserved.
    List(Vec<AttrValue>),
    /// Nested member map from a collection-typed value.
    Collection(AttributeMap),
}

impl AttrValue {
    /// The scalar text, for single-valued attributes.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) | Self::Collection(_) => None,
        }
    }

    /// The first scalar reachable in this value: a scalar itself, or the
    /// first scalar member of a list.
    pub fn first_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(items) => items.iter().find_map(AttrValue::first_scalar),
            Self::Collection(_) => None,
        }
    }

    /// All scalar members in order.  A bare scalar yields one element;
    /// collections contribute nothing.
    pub fn scalars(&self) -> Vec<&str> {
        match self {
            Self::Scalar(s) => vec![s.as_str()],
            Self::List(items) => items.iter().flat_map(AttrValue::scalars).collect(),
            Self::Collection(_) => Vec::new(),
        }
    }
}

/// Attribute name → value mapping shared by all three parsers.
pub type AttributeMap = BTreeMap<String, AttrValue>;

/// Insert a value, accumulating repeated names into a `List` in
/// encounter order.
pub(crate) fn insert_attr(map: &mut AttributeMap, name: String, value: AttrValue) {
    match map.entry(name) {
        std::collections::btree_map::Entry::Vacant(slot) => {
            slot.insert(value);
        }
        std::collections::btree_map::Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            if let AttrValue::List(items) = existing {
                items.push(value);
            } else {
                let previous = std::mem::replace(existing, AttrValue::List(Vec::new()));
                if let AttrValue::List(items) = existing {
                    items.push(previous);
                    items.push(value);
                }
            }
        }
    }
}

/// Whether a name is plausible as an attribute key.  Used by the line
/// parser to skip tool banners and pass/fail summaries.
pub(crate) fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
