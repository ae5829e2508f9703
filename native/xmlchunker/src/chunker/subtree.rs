//! Subtree Reserializer
//!
//! Copies the element the chunker just matched, and everything beneath it,
//! into a fresh standalone document. The whole subtree is consumed here
//! before control returns to the scanning loop, so the matcher never sees
//! elements nested inside a chunk.

use super::stack::ElementStack;
use crate::error::Result;
use crate::reader::events::{Attribute, StartElement, XmlEvent};
use crate::reader::XmlStreamReader;
use crate::writer::XmlWriter;
use std::io::Read;

/// Reserialize the subtree opened by `opening`
///
/// `opening` has already been consumed from `reader` and pushed onto
/// `stack`. On return the stack is back to the depth it had before the push.
/// If the stream ends first the chunk holds whatever was copied; the reader
/// reports an unclosed element before that can happen.
pub fn reserialize<R: Read>(
    reader: &mut XmlStreamReader<R>,
    stack: &mut ElementStack,
    opening: &StartElement,
) -> Result<String> {
    let entry_depth = stack.len();
    let mut writer = XmlWriter::new();
    writer.write_start_document("UTF-8", "1.0")?;

    let root = with_inherited_namespaces(opening, reader.inherited_namespaces());
    writer.write_event(&XmlEvent::StartElement(root))?;

    while stack.len() >= entry_depth {
        let event = reader.next_event()?;
        match &event {
            XmlEvent::StartElement(start) => stack.push(start.local_name()),
            XmlEvent::EndElement(_) => {
                stack.pop();
            }
            XmlEvent::EndDocument => break,
            _ => {}
        }
        writer.write_event(&event)?;
    }

    writer.write_end_document();
    Ok(writer.finish())
}

/// Copy of `opening` that also declares every namespace it inherits from
/// ancestors outside the chunk and does not redeclare itself
fn with_inherited_namespaces(opening: &StartElement, inherited: Vec<(String, String)>) -> StartElement {
    let mut root = opening.clone();
    for (prefix, uri) in inherited {
        if opening.namespace_declarations().any(|(p, _)| p == prefix) {
            continue;
        }
        let name = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        root.attributes.push(Attribute { name, value: uri });
    }
    root
}
