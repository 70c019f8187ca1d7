// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Apple-style XML property list parser.
//
// The attribute query tool's `-X` mode wraps the response in a plist
// document.  Somewhere inside it sits a `response-attributes` array of
// attribute dictionaries, each carrying a `name`, a `value-tag`, and a
// `values` array of wrapped scalars:
//
//   <key>response-attributes</key>
//   <array>
//     <dict>
//       <key>name</key><string>printer-state</string>
//       <key>value-tag</key><string>enum</string>
//       <key>values</key><array><integer>4</integer></array>
//     </dict>
//   </array>
//
// Booleans normalize to the literal strings "true"/"false"; values under
// a collection tag recurse into nested member maps.  The payload is
// truncated to the outermost <plist>…</plist> before parsing so that tool
// banners and trailing summaries are never seen by the XML reader.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{insert_attr, AttrValue, AttributeMap};

/// Generic property-list value tree.
#[derive(Debug, Clone, PartialEq)]
enum PlistValue {
    String(String),
    Integer(i64),
    Bool(bool),
    Array(Vec<PlistValue>),
    Dict(BTreeMap<String, PlistValue>),
}

/// Parse a property-list payload into an attribute map.  Total: malformed
/// documents yield an empty map.
pub fn parse(input: &str) -> AttributeMap {
    let mut map = AttributeMap::new();
    let Some(payload) = extract_payload(input) else {
        return map;
    };
    let Some(root) = parse_document(payload) else {
        return map;
    };
    let Some(attributes) = find_response_attributes(&root) else {
        return map;
    };

    for entry in attributes {
        let PlistValue::Dict(dict) = entry else {
            continue;
        };
        let Some(PlistValue::String(name)) = dict.get("name") else {
            continue;
        };
        let tag = match dict.get("value-tag") {
            Some(PlistValue::String(tag)) => tag.as_str(),
            _ => "",
        };
        let Some(PlistValue::Array(values)) = dict.get("values") else {
            continue;
        };

        let converted: Vec<AttrValue> = values
            .iter()
            .map(|value| convert_value(value, tag == "collection"))
            .collect();
        match converted.len() {
            0 => {}
            1 => {
                let mut converted = converted;
                insert_attr(&mut map, name.clone(), converted.remove(0));
            }
            _ => insert_attr(&mut map, name.clone(), AttrValue::List(converted)),
        }
    }
    map
}

/// Truncate to the outermost `<plist …>…</plist>` element.
fn extract_payload(input: &str) -> Option<&str> {
    let start = input.find("<plist")?;
    let close = "</plist>";
    let end = input.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&input[start..end + close.len()])
}

/// One wrapped value from a `values` array.
fn convert_value(value: &PlistValue, collection_tagged: bool) -> AttrValue {
    match value {
        PlistValue::Dict(members) if collection_tagged => {
            AttrValue::Collection(convert_member_map(members))
        }
        other => convert_scalar(other),
    }
}

fn convert_scalar(value: &PlistValue) -> AttrValue {
    match value {
        PlistValue::String(s) => AttrValue::Scalar(s.clone()),
        PlistValue::Integer(n) => AttrValue::Scalar(n.to_string()),
        PlistValue::Bool(b) => AttrValue::Scalar(if *b { "true" } else { "false" }.to_owned()),
        PlistValue::Array(items) => {
            AttrValue::List(items.iter().map(convert_scalar).collect())
        }
        PlistValue::Dict(members) => AttrValue::Collection(convert_member_map(members)),
    }
}

fn convert_member_map(members: &BTreeMap<String, PlistValue>) -> AttributeMap {
    let mut map = AttributeMap::new();
    for (name, value) in members {
        insert_attr(&mut map, name.clone(), convert_scalar(value));
    }
    map
}

/// Depth-first search for the first `response-attributes` array.
fn find_response_attributes(value: &PlistValue) -> Option<&Vec<PlistValue>> {
    match value {
        PlistValue::Dict(dict) => {
            if let Some(PlistValue::Array(items)) = dict.get("response-attributes") {
                return Some(items);
            }
            dict.values().find_map(find_response_attributes)
        }
        PlistValue::Array(items) => items.iter().find_map(find_response_attributes),
        _ => None,
    }
}

// -- XML event plumbing -----------------------------------------------------

/// Parse the document's root value (the element following `<plist>`).
fn parse_document(payload: &str) -> Option<PlistValue> {
    let mut reader = Reader::from_str(payload);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"plist" => {}
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                return parse_element(&mut reader, &name);
            }
            Ok(Event::Empty(e)) => return empty_element(e.local_name().as_ref()),
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parse one element whose start tag was just consumed.
fn parse_element(reader: &mut Reader<&[u8]>, name: &[u8]) -> Option<PlistValue> {
    match name {
        b"dict" => parse_dict(reader),
        b"array" => parse_array(reader),
        b"true" => {
            skip_element(reader)?;
            Some(PlistValue::Bool(true))
        }
        b"false" => {
            skip_element(reader)?;
            Some(PlistValue::Bool(false))
        }
        b"integer" => {
            let text = read_text(reader, b"integer")?;
            Some(match text.trim().parse::<i64>() {
                Ok(n) => PlistValue::Integer(n),
                Err(_) => PlistValue::String(text),
            })
        }
        b"string" | b"real" | b"data" | b"date" => {
            Some(PlistValue::String(read_text(reader, name)?))
        }
        _ => {
            skip_element(reader)?;
            None
        }
    }
}

fn empty_element(name: &[u8]) -> Option<PlistValue> {
    match name {
        b"true" => Some(PlistValue::Bool(true)),
        b"false" => Some(PlistValue::Bool(false)),
        b"dict" => Some(PlistValue::Dict(BTreeMap::new())),
        b"array" => Some(PlistValue::Array(Vec::new())),
        b"string" => Some(PlistValue::String(String::new())),
        _ => None,
    }
}

fn parse_dict(reader: &mut Reader<&[u8]>) -> Option<PlistValue> {
    let mut dict = BTreeMap::new();
    let mut pending_key: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"key" => {
                pending_key = Some(read_text(reader, b"key")?);
            }
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                let value = parse_element(reader, &name);
                if let (Some(key), Some(value)) = (pending_key.take(), value) {
                    dict.insert(key, value);
                }
            }
            Ok(Event::Empty(e)) => {
                let value = empty_element(e.local_name().as_ref());
                if let (Some(key), Some(value)) = (pending_key.take(), value) {
                    dict.insert(key, value);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"dict" => {
                return Some(PlistValue::Dict(dict));
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn parse_array(reader: &mut Reader<&[u8]>) -> Option<PlistValue> {
    let mut items = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if let Some(value) = parse_element(reader, &name) {
                    items.push(value);
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(value) = empty_element(e.local_name().as_ref()) {
                    items.push(value);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"array" => {
                return Some(PlistValue::Array(items));
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Accumulate text content until the named end tag.
fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Option<String> {
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => text.push_str(&t.unescape().ok()?),
            Ok(Event::End(e)) if e.local_name().as_ref() == end => return Some(text),
            Ok(Event::Start(_)) => skip_element(reader)?,
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Skip the element whose start tag was just consumed.
fn skip_element(reader: &mut Reader<&[u8]>) -> Option<()> {
    let mut depth = 1u32;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                depth -= 1;
                if depth == 0 {
                    return Some(());
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Name</key>
    <string>Get printer attributes using Get-Printer-Attributes</string>
    <key>Successful</key>
    <true/>
    <key>response-attributes</key>
    <array>
        <dict>
            <key>name</key><string>printer-state</string>
            <key>value-tag</key><string>enum</string>
            <key>values</key><array><integer>4</integer></array>
        </dict>
        <dict>
            <key>name</key><string>marker-names</string>
            <key>value-tag</key><string>nameWithoutLanguage</string>
            <key>values</key><array><string>Black</string><string>Cyan</string></array>
        </dict>
        <dict>
            <key>name</key><string>printer-is-accepting-jobs</string>
            <key>value-tag</key><string>boolean</string>
            <key>values</key><array><true/></array>
        </dict>
    </array>
</dict>
</plist>"#;

    #[test]
    fn parses_wrapped_scalars() {
        let map = parse(SAMPLE);
        assert_eq!(
            map.get("printer-state").and_then(AttrValue::as_scalar),
            Some("4")
        );
        assert_eq!(
            map.get("marker-names").expect("present").scalars(),
            vec!["Black", "Cyan"]
        );
    }

    #[test]
    fn booleans_normalize_to_literal_strings() {
        let map = parse(SAMPLE);
        assert_eq!(
            map.get("printer-is-accepting-jobs")
                .and_then(AttrValue::as_scalar),
            Some("true")
        );
    }

    #[test]
    fn collection_tagged_values_recurse() {
        let map = parse(
            r#"<plist><dict>
                 <key>response-attributes</key>
                 <array>
                   <dict>
                     <key>name</key><string>media-col-default</string>
                     <key>value-tag</key><string>collection</string>
                     <key>values</key>
                     <array>
                       <dict>
                         <key>media-size-name</key><string>iso_a4_210x297mm</string>
                         <key>duplex</key><false/>
                       </dict>
                     </array>
                   </dict>
                 </array>
               </dict></plist>"#,
        );
        let AttrValue::Collection(members) = map.get("media-col-default").expect("present")
        else {
            panic!("expected collection");
        };
        assert_eq!(
            members.get("media-size-name").and_then(AttrValue::as_scalar),
            Some("iso_a4_210x297mm")
        );
        assert_eq!(members.get("duplex").and_then(AttrValue::as_scalar), Some("false"));
    }

    #[test]
    fn banners_around_the_payload_are_ignored() {
        let wrapped = format!("ipptool: running test...\n{SAMPLE}\nPASS\n");
        let map = parse(&wrapped);
        assert_eq!(
            map.get("printer-state").and_then(AttrValue::as_scalar),
            Some("4")
        );
    }

    #[test]
    fn malformed_documents_yield_empty_maps() {
        assert!(parse("").is_empty());
        assert!(parse("<plist version=\"1.0\">").is_empty());
        assert!(parse("<plist><dict><key>response-attributes</key></dict></plist>").is_empty());
        assert!(parse("random banner text only").is_empty());
    }
}
