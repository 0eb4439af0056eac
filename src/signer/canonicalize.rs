//! Exclusive XML canonicalization (Exclusive C14N, omitting comments) for
//! the narrow subset of XML this library itself produces: one default
//! namespace declared on the document root, no processing instructions, no
//! CDATA.
//!
//! A general XML C14N implementation has to handle arbitrary namespace
//! inheritance and inclusive-namespace prefix lists; SIFEN documents never
//! need that generality, so this canonicalizes the concrete shape the
//! assembler and mapper produce rather than arbitrary XML.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::error::SignerError;

/// Canonicalize `xml` per Exclusive C14N rules: strip the XML declaration,
/// drop comments, sort attributes by qualified name, use double-quoted
/// attribute values, and always emit explicit open/close tags (no
/// self-closing elements).
pub fn canonicalize(xml: &str) -> Result<Vec<u8>, SignerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = false;
    let mut buf = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| SignerError::Canonicalization(e.to_string()))?
        {
            Event::Eof => break,
            Event::Start(e) => write_open_tag(&mut out, &e, false)?,
            Event::Empty(e) => write_open_tag(&mut out, &e, true)?,
            Event::End(e) => {
                out.extend_from_slice(b"</");
                out.extend_from_slice(e.name().as_ref());
                out.push(b'>');
            }
            Event::Text(t) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| SignerError::Canonicalization(e.to_string()))?;
                out.extend_from_slice(escape_text(&unescaped).as_bytes());
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {
                // Comments are omitted by exclusive C14N; the declaration
                // and doctype have no canonical representation at all.
            }
            Event::CData(c) => {
                out.extend_from_slice(&c.into_inner());
            }
        }
        buf.clear();
    }

    Ok(out)
}

fn write_open_tag(
    out: &mut Vec<u8>,
    e: &quick_xml::events::BytesStart,
    was_empty: bool,
) -> Result<(), SignerError> {
    out.push(b'<');
    out.extend_from_slice(e.name().as_ref());

    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| SignerError::Canonicalization(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| SignerError::Canonicalization(err.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    attrs.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in &attrs {
        out.push(b' ');
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(escape_attr(value).as_bytes());
        out.push(b'"');
    }
    out.push(b'>');

    // C14N never emits self-closing tags; quick_xml's Empty event has no
    // matching End event, so close it here instead.
    if was_empty {
        out.extend_from_slice(b"</");
        out.extend_from_slice(e.name().as_ref());
        out.push(b'>');
    }
    Ok(())
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\r', "&#xD;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
        .replace('\t', "&#x9;")
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
}
