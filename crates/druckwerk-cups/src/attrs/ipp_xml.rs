// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP-XML attribute dump parser.
//
// The attribute query tool can emit a namespaced XML rendering of the
// response attribute groups:
//
//   <ipp xmlns="urn:ietf:params:xml:ns:ipp">
//     <attribute-group tag="printer-attributes-tag">
//       <attribute name="printer-state" syntax="enum"><value>4</value></attribute>
//       <attribute name="marker-names" syntax="1setOf nameWithoutLanguage">
//         <value>Black</value><value>Cyan</value>
//       </attribute>
//     </attribute-group>
//   </ipp>
//
// Collection-typed values nest a <collection> of named <member> elements
// and recurse into member maps.  Tool banners before the payload and
// summaries after it are discarded by truncating to the outermost
// <ipp>…</ipp> markers; a malformed tail never aborts the well-formed
// part already parsed.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{insert_attr, AttrValue, AttributeMap};

/// Parse an IPP-XML payload into an attribute map.  Total: returns the
/// attributes parsed up to the first malformation, possibly none.
pub fn parse(input: &str) -> AttributeMap {
    let mut map = AttributeMap::new();
    let Some(payload) = extract_payload(input) else {
        return map;
    };

    let mut reader = Reader::from_str(payload);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"attribute" => {
                let name = xml_attr(&e, "name");
                let Some(values) = collect_values(&mut reader) else {
                    break;
                };
                match name {
                    Some(name) if !values.is_empty() => {
                        insert_attr(&mut map, name, fold_values(values));
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }
    map
}

/// Truncate to the outermost `<ipp …>…</ipp>` element.
fn extract_payload(input: &str) -> Option<&str> {
    let start = input.find("<ipp")?;
    let close = "</ipp>";
    let end = input.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&input[start..end + close.len()])
}

/// One or more values become a scalar or an ordered list.
fn fold_values(mut values: Vec<AttrValue>) -> AttrValue {
    if values.len() == 1 {
        values.remove(0)
    } else {
        AttrValue::List(values)
    }
}

/// Read the `<value>` children of an `<attribute>` or `<member>` element,
/// stopping at its end tag.  Returns `None` on malformed XML.
fn collect_values(reader: &mut Reader<&[u8]>) -> Option<Vec<AttrValue>> {
    let mut values = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"value" => {
                values.push(parse_value(reader)?);
            }
            Ok(Event::Start(_)) => skip_element(reader)?,
            Ok(Event::End(e))
                if matches!(e.local_name().as_ref(), b"attribute" | b"member") =>
            {
                return Some(values);
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Read one `<value>` element: text content, or a nested collection.
fn parse_value(reader: &mut Reader<&[u8]>) -> Option<AttrValue> {
    let mut text = String::new();
    let mut collection = None;
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => text.push_str(&t.unescape().ok()?),
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"collection" => {
                collection = Some(parse_collection(reader)?);
            }
            Ok(Event::Start(_)) => skip_element(reader)?,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"value" => {
                return Some(match collection {
                    Some(members) => AttrValue::Collection(members),
                    None => AttrValue::Scalar(text.trim().to_owned()),
                });
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Read a `<collection>` of named `<member>` elements into a member map.
fn parse_collection(reader: &mut Reader<&[u8]>) -> Option<AttributeMap> {
    let mut members = AttributeMap::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"member" => {
                let name = xml_attr(&e, "name");
                let values = collect_values(reader)?;
                if let Some(name) = name
                    && !values.is_empty()
                {
                    insert_attr(&mut members, name, fold_values(values));
                }
            }
            Ok(Event::Start(_)) => skip_element(reader)?,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"collection" => {
                return Some(members);
            }
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

/// Read a named XML attribute off a start tag.
fn xml_attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}
