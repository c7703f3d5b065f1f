use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use std::io::Cursor;

use crate::core::FacturaError;
use crate::core::codes::{format_amount, format_quantity};

pub type XmlResult = Result<String, FacturaError>;

fn xml_io(e: std::io::Error) -> FacturaError {
    FacturaError::SignatureAssembly(format!("XML write error: {e}"))
}

/// Thin writer over `quick_xml` used by every XML producer in the crate.
///
/// Documents get an XML declaration and two-space indentation; fragments
/// (extension content, signature elements, WS-Security headers) are written
/// compact so their bytes survive canonicalization-sensitive contexts.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    /// Writer for a full document: XML declaration, indented.
    pub fn document() -> Result<Self, FacturaError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    /// Writer for an inline fragment: no declaration, no indentation.
    pub fn fragment() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    pub fn into_string(self) -> Result<String, FacturaError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf)
            .map_err(|e| FacturaError::SignatureAssembly(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturaError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    /// Write an empty element (`<name/>`).
    pub fn empty_element(&mut self, name: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn empty_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturaError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Empty(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, FacturaError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    pub fn text_element_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturaError> {
        self.start_element_with_attrs(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Inject an already-serialized XML fragment verbatim.
    pub fn raw(&mut self, fragment: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(fragment)))
            .map_err(xml_io)?;
        Ok(self)
    }

    /// Write a decimal amount with a `currencyID` attribute.
    pub fn amount_element(
        &mut self,
        name: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<&mut Self, FacturaError> {
        self.text_element_with_attrs(name, &format_amount(amount), &[("currencyID", currency)])
    }

    /// Write a quantity with a `unitCode` attribute.
    pub fn quantity_element(
        &mut self,
        name: &str,
        qty: Decimal,
        unit: &str,
    ) -> Result<&mut Self, FacturaError> {
        self.text_element_with_attrs(name, &format_quantity(qty), &[("unitCode", unit)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fragment_is_compact() {
        let mut w = XmlWriter::fragment();
        w.start_element("a")
            .unwrap()
            .text_element("b", "x")
            .unwrap()
            .end_element("a")
            .unwrap();
        assert_eq!(w.into_string().unwrap(), "<a><b>x</b></a>");
    }

    #[test]
    fn amount_carries_currency() {
        let mut w = XmlWriter::fragment();
        w.amount_element("cbc:PayableAmount", dec!(119000), "COP")
            .unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            "<cbc:PayableAmount currencyID=\"COP\">119000.00</cbc:PayableAmount>"
        );
    }

    #[test]
    fn raw_fragment_is_not_escaped() {
        let mut w = XmlWriter::fragment();
        w.start_element("ext:ExtensionContent")
            .unwrap()
            .raw("<sts:Thing>v</sts:Thing>")
            .unwrap()
            .end_element("ext:ExtensionContent")
            .unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            "<ext:ExtensionContent><sts:Thing>v</sts:Thing></ext:ExtensionContent>"
        );
    }
}
