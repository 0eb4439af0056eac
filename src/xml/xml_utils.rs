use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;

use super::error::XmlError;

fn xml_io(e: std::io::Error) -> XmlError {
    XmlError::Write(e.to_string())
}

/// Thin wrapper over [`quick_xml::Writer`] used by both the modular and
/// official assemblers.
///
/// Deliberately emits no indentation: the document this produces is the
/// one that gets canonicalized and signed, and an indenting writer would
/// insert whitespace text nodes that change the canonical form.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, XmlError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, XmlError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| XmlError::Utf8(e.to_string()))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, XmlError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, XmlError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer.write_event(Event::Start(elem)).map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, XmlError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, XmlError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }
}

/// Format a decimal amount the way SET expects: exactly `decimal_places`
/// fractional digits, no thousands separators (§4.1 amount format rule).
pub fn format_amount(value: Decimal, decimal_places: u32) -> String {
    format!("{:.*}", decimal_places as usize, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn format_amount_pads_to_requested_places() {
        assert_eq!(format_amount(dec!(100), 0), "100");
        assert_eq!(format_amount(dec!(100), 2), "100.00");
        assert_eq!(format_amount(dec!(49.9), 2), "49.90");
    }

    #[test]
    fn writer_roundtrips_simple_document() {
        let mut w = XmlWriter::new().unwrap();
        w.start_element("root").unwrap();
        w.text_element("child", "value").unwrap();
        w.end_element("root").unwrap();
        let xml = w.into_string().unwrap();
        assert!(xml.contains("<root>"));
        assert!(xml.contains("<child>value</child>"));
        assert!(!xml.contains('\n'), "writer must not add indentation");
    }
}
