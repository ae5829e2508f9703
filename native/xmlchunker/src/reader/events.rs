//! XML Event Types
//!
//! Owned events produced by the streaming reader. Character data and
//! attribute values are kept in escaped source form so an event can be
//! written back out without a decode/encode round trip; the `*_decoded`
//! accessors give the logical values.

use crate::core::entities::decode_text;
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration {
        version: String,
        encoding: Option<String>,
        standalone: Option<bool>,
    },
    /// DOCTYPE declaration, kept verbatim
    DocType(String),
    /// Start of an element: <name attrs...>; empty elements are reported as
    /// a start event followed by an end event
    StartElement(StartElement),
    /// End of an element: </name>
    EndElement(EndElement),
    /// Text content between tags (escaped)
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment content
    Comment(String),
    /// Processing instruction: <?target data?>
    ProcessingInstruction {
        target: String,
        data: Option<String>,
    },
    /// End of document
    EndDocument,
}

impl XmlEvent {
    /// Check if this is a start element event
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_))
    }

    /// Check if this is an end element event
    pub fn is_end_element(&self) -> bool {
        matches!(self, XmlEvent::EndElement(_))
    }

    /// Get as start element if applicable
    pub fn as_start_element(&self) -> Option<&StartElement> {
        match self {
            XmlEvent::StartElement(e) => Some(e),
            _ => None,
        }
    }
}

/// A single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name (may include namespace prefix)
    pub name: String,
    /// Escaped value, safe to place between double quotes
    pub value: String,
}

impl Attribute {
    /// Build from a source value delimited by `quote`
    ///
    /// A single-quoted value may contain a literal '"'; it is escaped so the
    /// value can always be written double-quoted.
    pub fn from_source(name: String, value: String, quote: u8) -> Self {
        let value = if quote == b'\'' && value.contains('"') {
            value.replace('"', "&quot;")
        } else {
            value
        };
        Attribute { name, value }
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    /// Value with entity references decoded
    pub fn value_decoded(&self) -> Cow<'_, str> {
        decode_text(&self.value)
    }

    /// If this attribute declares a namespace, the declared prefix
    /// (`""` for the default namespace)
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

/// Start element event data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    /// Full element name (may include prefix)
    pub name: String,
    /// Element attributes, namespace declarations included
    pub attributes: Vec<Attribute>,
}

impl StartElement {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        StartElement {
            name: name.into(),
            attributes,
        }
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    /// Get an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Namespace declarations made on this element as (prefix, escaped uri)
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter_map(|a| a.declared_prefix().map(|p| (p, a.value.as_str())))
    }
}

/// End element event data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndElement {
    /// Full element name
    pub name: String,
}

impl EndElement {
    pub fn new(name: impl Into<String>) -> Self {
        EndElement { name: name.into() }
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }
}

/// Split a name into prefix and local name at the colon
fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_element() {
        let elem = StartElement::new("Artist", vec![]);
        assert_eq!(elem.local_name(), "Artist");
        assert!(elem.prefix().is_none());
    }

    #[test]
    fn test_namespaced_element() {
        let elem = StartElement::new("svg:rect", vec![]);
        assert_eq!(elem.local_name(), "rect");
        assert_eq!(elem.prefix(), Some("svg"));
        assert_eq!(EndElement::new("svg:rect").local_name(), "rect");
    }

    #[test]
    fn test_namespace_declarations() {
        let elem = StartElement::new(
            "x:Response",
            vec![
                Attribute::from_source("xmlns".into(), "urn:default".into(), b'"'),
                Attribute::from_source("xmlns:x".into(), "urn:x".into(), b'"'),
                Attribute::from_source("id".into(), "1".into(), b'"'),
            ],
        );
        let decls: Vec<_> = elem.namespace_declarations().collect();
        assert_eq!(decls, vec![("", "urn:default"), ("x", "urn:x")]);
    }

    #[test]
    fn test_single_quoted_value_normalized() {
        let attr = Attribute::from_source("title".into(), "say \"hi\"".into(), b'\'');
        assert_eq!(attr.value, "say &quot;hi&quot;");
        assert_eq!(attr.value_decoded(), "say \"hi\"");
        assert_eq!(attr.local_name(), "title");
    }
}
