//! Bidirectional mapping between the library's modular XML shape and the
//! official SET v150 `gOpeDE` wire shape (§4.4).
//!
//! The two shapes differ only in a handful of group names and in how line
//! items are wrapped. Keeping that difference as a data table (rather than
//! as parallel serializers) is what makes the round trip provable: map then
//! unmap is the identity on any tree built from these rules (§8.3).

use std::io::{Cursor, Write as _};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use super::error::MapperError;

/// A `(modular, official)` name pair for elements that are renamed but not
/// restructured between shapes.
const RENAMES: &[(&str, &str)] = &[
    ("gDatGral", "gOpeDE"),
    ("gDatEmi", "gEmis"),
    ("gTotales", "gTotSub"),
];

const ITEM_WRAPPER_MODULAR: &str = "gItems";
const ITEM_ELEMENT_MODULAR: &str = "gItem";
const ITEM_ELEMENT_OFFICIAL: &str = "gCamItem";

fn modular_to_official_name(name: &str) -> &str {
    RENAMES
        .iter()
        .find(|(modular, _)| *modular == name)
        .map(|(_, official)| *official)
        .unwrap_or(name)
}

fn official_to_modular_name(name: &str) -> &str {
    RENAMES
        .iter()
        .find(|(_, official)| *official == name)
        .map(|(modular, _)| *modular)
        .unwrap_or(name)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToOfficial,
    ToModular,
}

/// An owned, 'static copy of a parsed XML event — materializing the whole
/// stream up front is what lets the official→modular direction look ahead
/// far enough to know where a run of `gCamItem` siblings ends, which is
/// needed to re-close the synthetic `gItems` wrapper.
enum OwnedEvent {
    Start(String, Vec<(String, String)>),
    End(String),
    Empty(String, Vec<(String, String)>),
    Other(Vec<u8>),
}

fn parse_all(xml: &str) -> Result<Vec<OwnedEvent>, MapperError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = false;
    let mut buf = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| MapperError::Parse(e.to_string()))?
        {
            Event::Eof => break,
            Event::Start(e) => out.push(OwnedEvent::Start(local_name(e.name()), attrs(&e)?)),
            Event::Empty(e) => out.push(OwnedEvent::Empty(local_name(e.name()), attrs(&e)?)),
            Event::End(e) => out.push(OwnedEvent::End(local_name(e.name()))),
            other => {
                let mut w = Writer::new(Cursor::new(Vec::new()));
                w.write_event(other)
                    .map_err(|e| MapperError::Parse(e.to_string()))?;
                out.push(OwnedEvent::Other(w.into_inner().into_inner()));
            }
        }
        buf.clear();
    }
    Ok(out)
}

fn local_name(name: QName) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn attrs(e: &BytesStart) -> Result<Vec<(String, String)>, MapperError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| MapperError::Parse(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| MapperError::Parse(err.to_string()))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn write_start(
    w: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    attrs: &[(String, String)],
    empty: bool,
) -> Result<(), MapperError> {
    let mut elem = BytesStart::new(name);
    for (k, v) in attrs {
        elem.push_attribute((k.as_str(), v.as_str()));
    }
    let event = if empty { Event::Empty(elem) } else { Event::Start(elem) };
    w.write_event(event).map_err(|e| MapperError::Parse(e.to_string()))
}

fn write_end(w: &mut Writer<Cursor<Vec<u8>>>, name: &str) -> Result<(), MapperError> {
    w.write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| MapperError::Parse(e.to_string()))
}

/// Transform a modular-shape document into the official `gOpeDE` shape.
pub fn modular_to_official(xml: &str) -> Result<String, MapperError> {
    transform(xml, Direction::ToOfficial)
}

/// Transform an official-shape document back into the modular shape.
pub fn official_to_modular(xml: &str) -> Result<String, MapperError> {
    transform(xml, Direction::ToModular)
}

fn transform(xml: &str, direction: Direction) -> Result<String, MapperError> {
    let events = parse_all(xml)?;
    let mut w = Writer::new(Cursor::new(Vec::new()));
    let mut items_open = false;

    for (i, event) in events.iter().enumerate() {
        match event {
            OwnedEvent::Start(name, a) | OwnedEvent::Empty(name, a) => {
                let empty = matches!(event, OwnedEvent::Empty(_, _));

                if direction == Direction::ToOfficial && name == ITEM_WRAPPER_MODULAR {
                    // Dropped: gCamItem children are written as direct
                    // siblings in the official shape.
                    continue;
                }

                if direction == Direction::ToModular
                    && name == ITEM_ELEMENT_OFFICIAL
                    && !items_open
                {
                    write_start(&mut w, ITEM_WRAPPER_MODULAR, &[], false)?;
                    items_open = true;
                }

                let mapped: String = match direction {
                    Direction::ToOfficial if name == ITEM_ELEMENT_MODULAR => {
                        ITEM_ELEMENT_OFFICIAL.to_string()
                    }
                    Direction::ToOfficial => modular_to_official_name(name).to_string(),
                    Direction::ToModular if name == ITEM_ELEMENT_OFFICIAL => {
                        ITEM_ELEMENT_MODULAR.to_string()
                    }
                    Direction::ToModular => official_to_modular_name(name).to_string(),
                };
                write_start(&mut w, &mapped, a, empty)?;
            }
            OwnedEvent::End(name) => {
                if direction == Direction::ToOfficial && name == ITEM_WRAPPER_MODULAR {
                    continue;
                }

                let mapped = match direction {
                    Direction::ToOfficial if name == ITEM_ELEMENT_MODULAR => {
                        ITEM_ELEMENT_OFFICIAL.to_string()
                    }
                    Direction::ToOfficial => modular_to_official_name(name).to_string(),
                    Direction::ToModular if name == ITEM_ELEMENT_OFFICIAL => {
                        ITEM_ELEMENT_MODULAR.to_string()
                    }
                    Direction::ToModular => official_to_modular_name(name).to_string(),
                };
                write_end(&mut w, &mapped)?;

                if direction == Direction::ToModular && name == ITEM_ELEMENT_OFFICIAL && items_open
                {
                    let next_is_item = matches!(
                        events.get(i + 1),
                        Some(OwnedEvent::Start(n, _)) | Some(OwnedEvent::Empty(n, _))
                            if n == ITEM_ELEMENT_OFFICIAL
                    );
                    if !next_is_item {
                        write_end(&mut w, ITEM_WRAPPER_MODULAR)?;
                        items_open = false;
                    }
                }
            }
            OwnedEvent::Other(raw) => {
                w.inner().write_all(raw).map_err(|e| MapperError::Parse(e.to_string()))?;
            }
        }
    }

    let buf = w.into_inner().into_inner();
    String::from_utf8(buf).map_err(|e| MapperError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_modular() -> String {
        concat!(
            "<rDE Id=\"x\">",
            "<gDatGral>",
            "<gDatEmi><dRucEm>80000001</dRucEm></gDatEmi>",
            "<gItems><gItem><dCodInt>A</dCodInt></gItem><gItem><dCodInt>B</dCodInt></gItem></gItems>",
            "<gTotales><dTotalGs>100</dTotalGs></gTotales>",
            "</gDatGral>",
            "</rDE>"
        )
        .to_string()
    }

    #[test]
    fn renames_top_level_groups() {
        let official = modular_to_official(&sample_modular()).unwrap();
        assert!(official.contains("<gOpeDE>"));
        assert!(official.contains("<gEmis>"));
        assert!(official.contains("<gTotSub>"));
        assert!(!official.contains("gDatGral"));
    }

    #[test]
    fn unwraps_items_into_repeated_siblings() {
        let official = modular_to_official(&sample_modular()).unwrap();
        assert!(!official.contains("gItems"));
        assert_eq!(official.matches("<gCamItem>").count(), 2);
    }

    #[test]
    fn round_trips_through_both_directions() {
        let modular = sample_modular();
        let official = modular_to_official(&modular).unwrap();
        let back = official_to_modular(&official).unwrap();
        assert_eq!(back, modular);
    }

    #[test]
    fn official_to_modular_then_back_is_identity() {
        let modular = sample_modular();
        let official = modular_to_official(&modular).unwrap();
        let official_again = modular_to_official(&official_to_modular(&official).unwrap()).unwrap();
        assert_eq!(official, official_again);
    }
}
