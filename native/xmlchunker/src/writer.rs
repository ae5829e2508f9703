//! XML Writer
//!
//! Serializes reader events back into a standalone document. Events carry
//! their character data in escaped form, so text and attribute values are
//! copied as-is. A start tag is left open until the next event arrives so an
//! element without content can be collapsed to `<x/>`.

use crate::error::{ChunkerError, Result};
use crate::reader::events::{StartElement, XmlEvent};

/// Accumulating XML writer
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
    open: Vec<String>,
    /// The last start tag still lacks its closing '>'
    start_pending: bool,
    started: bool,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        XmlWriter {
            out: String::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Number of elements opened and not yet closed
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Write the XML declaration; must come before anything else
    pub fn write_start_document(&mut self, encoding: &str, version: &str) -> Result<()> {
        if self.started || !self.out.is_empty() {
            return Err(ChunkerError::Writer("document already started".into()));
        }
        self.started = true;
        self.out.push_str("<?xml version=\"");
        self.out.push_str(version);
        self.out.push_str("\" encoding=\"");
        self.out.push_str(encoding);
        self.out.push_str("\"?>");
        Ok(())
    }

    /// Copy one event into the output
    pub fn write_event(&mut self, event: &XmlEvent) -> Result<()> {
        match event {
            XmlEvent::StartElement(start) => self.write_start_element(start),
            XmlEvent::EndElement(end) => self.write_end_element(&end.name)?,
            XmlEvent::Text(text) => {
                self.close_start_tag();
                self.out.push_str(text);
            }
            XmlEvent::CData(data) => {
                self.close_start_tag();
                self.out.push_str("<![CDATA[");
                self.out.push_str(data);
                self.out.push_str("]]>");
            }
            XmlEvent::Comment(comment) => {
                self.close_start_tag();
                self.out.push_str("<!--");
                self.out.push_str(comment);
                self.out.push_str("-->");
            }
            XmlEvent::ProcessingInstruction { target, data } => {
                self.close_start_tag();
                self.out.push_str("<?");
                self.out.push_str(target);
                if let Some(data) = data {
                    self.out.push(' ');
                    self.out.push_str(data);
                }
                self.out.push_str("?>");
            }
            XmlEvent::DocType(doctype) => {
                if !self.open.is_empty() {
                    return Err(ChunkerError::Writer("DOCTYPE inside an element".into()));
                }
                self.out.push_str(doctype);
            }
            XmlEvent::XmlDeclaration { .. } => {
                return Err(ChunkerError::Writer(
                    "XML declaration must be written with write_start_document".into(),
                ))
            }
            XmlEvent::EndDocument => {}
        }
        Ok(())
    }

    fn write_start_element(&mut self, start: &StartElement) {
        self.close_start_tag();
        self.out.push('<');
        self.out.push_str(&start.name);
        for attr in &start.attributes {
            self.out.push(' ');
            self.out.push_str(&attr.name);
            self.out.push_str("=\"");
            self.out.push_str(&attr.value);
            self.out.push('"');
        }
        self.open.push(start.name.clone());
        self.start_pending = true;
    }

    fn write_end_element(&mut self, name: &str) -> Result<()> {
        match self.open.pop() {
            None => Err(ChunkerError::Writer(format!(
                "end element </{name}> with no open element"
            ))),
            Some(open) if open != name => Err(ChunkerError::Writer(format!(
                "end element </{name}> does not close <{open}>"
            ))),
            Some(open) => {
                self.close_element(&open);
                Ok(())
            }
        }
    }

    fn close_element(&mut self, name: &str) {
        if self.start_pending {
            self.start_pending = false;
            self.out.push_str("/>");
        } else {
            self.out.push_str("</");
            self.out.push_str(name);
            self.out.push('>');
        }
    }

    fn close_start_tag(&mut self) {
        if self.start_pending {
            self.start_pending = false;
            self.out.push('>');
        }
    }

    /// Close every element still open
    pub fn write_end_document(&mut self) {
        while let Some(name) = self.open.pop() {
            self.close_element(&name);
        }
    }

    /// The document written so far
    pub fn finish(mut self) -> String {
        self.close_start_tag();
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::events::{Attribute, EndElement};

    fn start(name: &str, attrs: &[(&str, &str)]) -> XmlEvent {
        XmlEvent::StartElement(StartElement::new(
            name,
            attrs
                .iter()
                .map(|(n, v)| Attribute::from_source(n.to_string(), v.to_string(), b'"'))
                .collect(),
        ))
    }

    fn end(name: &str) -> XmlEvent {
        XmlEvent::EndElement(EndElement::new(name))
    }

    #[test]
    fn test_document_with_content() {
        let mut w = XmlWriter::new();
        w.write_start_document("UTF-8", "1.0").unwrap();
        w.write_event(&start("Artist", &[("id", "1")])).unwrap();
        w.write_event(&start("Name", &[])).unwrap();
        w.write_event(&XmlEvent::Text("Len &amp; Lye".into())).unwrap();
        w.write_event(&end("Name")).unwrap();
        w.write_event(&start("Photo", &[])).unwrap();
        w.write_event(&end("Photo")).unwrap();
        w.write_event(&end("Artist")).unwrap();
        w.write_end_document();
        assert_eq!(
            w.finish(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Artist id=\"1\"><Name>Len &amp; Lye</Name><Photo/></Artist>"
        );
    }

    #[test]
    fn test_other_events() {
        let mut w = XmlWriter::new();
        w.write_event(&start("a", &[])).unwrap();
        w.write_event(&XmlEvent::Comment(" note ".into())).unwrap();
        w.write_event(&XmlEvent::CData("x < y".into())).unwrap();
        w.write_event(&XmlEvent::ProcessingInstruction {
            target: "render".into(),
            data: Some("fast".into()),
        })
        .unwrap();
        w.write_event(&end("a")).unwrap();
        assert_eq!(
            w.finish(),
            "<a><!-- note --><![CDATA[x < y]]><?render fast?></a>"
        );
    }

    #[test]
    fn test_end_document_closes_open_elements() {
        let mut w = XmlWriter::new();
        w.write_event(&start("a", &[])).unwrap();
        w.write_event(&start("b", &[])).unwrap();
        w.write_event(&XmlEvent::Text("t".into())).unwrap();
        assert_eq!(w.depth(), 2);
        w.write_end_document();
        assert_eq!(w.depth(), 0);
        assert_eq!(w.finish(), "<a><b>t</b></a>");
    }

    #[test]
    fn test_errors() {
        let mut w = XmlWriter::new();
        assert!(matches!(w.write_event(&end("a")), Err(ChunkerError::Writer(_))));

        w.write_event(&start("a", &[])).unwrap();
        assert!(matches!(w.write_event(&end("b")), Err(ChunkerError::Writer(_))));
        assert!(matches!(
            w.write_start_document("UTF-8", "1.0"),
            Err(ChunkerError::Writer(_))
        ));
    }
}
