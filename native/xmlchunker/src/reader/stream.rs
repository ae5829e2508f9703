//! Streaming Pull Reader
//!
//! Produces one [`XmlEvent`] per call from any `Read` source without ever
//! holding more than the current token in memory. The reader refuses
//! documents that are not well-formed: mismatched or stray end tags,
//! unclosed elements, several roots, stray text outside the root, or input
//! that ends inside markup.
//!
//! UTF-16 input (with or without a byte order mark) and documents declaring
//! an ASCII-compatible encoding such as ISO-8859-1 are transcoded to UTF-8
//! as they are read. Entities declared in the DOCTYPE's internal subset are
//! expanded in text and attribute values; any other non-predefined
//! reference is an error.

use super::buffered::BufferedReader;
use super::events::{Attribute, EndElement, StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::dtd::EntityTable;
use crate::core::encoding::{resolve_declared, sniff};
use crate::core::scanner::is_whitespace;
use crate::core::tokenizer::{Step, Token, TokenKind, Tokenizer};
use crate::error::{ChunkerError, ParseError, Result};
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use std::io::Read;

/// An element the reader has opened but not yet closed
#[derive(Debug)]
struct OpenScope {
    name: String,
    /// (prefix, uri) declared on this element
    namespaces: Vec<(String, String)>,
}

/// Pull-based XML reader over a byte stream
pub struct XmlStreamReader<R: Read> {
    input: BufferedReader<R>,
    open: Vec<OpenScope>,
    /// End event owed for an empty-element tag just reported
    pending_end: Option<EndElement>,
    started: bool,
    /// Offset of the first byte after any byte order mark
    content_start: u64,
    encoding: &'static Encoding,
    /// Byte order mark length, zero without one
    bom_len: usize,
    entities: EntityTable,
    seen_root: bool,
    events_read: u64,
    finished: bool,
}

impl<R: Read> XmlStreamReader<R> {
    /// Wrap a byte source; nothing is read until the first event is pulled
    pub fn new(reader: R) -> Self {
        Self::from_buffered(BufferedReader::new(reader))
    }

    /// Wrap a byte source with a specific read window size
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self::from_buffered(BufferedReader::with_capacity(reader, capacity))
    }

    fn from_buffered(input: BufferedReader<R>) -> Self {
        XmlStreamReader {
            input,
            open: Vec::new(),
            pending_end: None,
            started: false,
            content_start: 0,
            encoding: UTF_8,
            bom_len: 0,
            entities: EntityTable::new(),
            seen_root: false,
            events_read: 0,
            finished: false,
        }
    }

    /// Current element nesting depth as seen by the reader
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Encoding the document is being decoded from
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Bytes of the source consumed so far
    ///
    /// Counts UTF-8 bytes once a document is being transcoded.
    pub fn bytes_consumed(&self) -> u64 {
        self.input.position()
    }

    /// Whether `EndDocument` has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Namespace declarations in scope for the innermost open element that
    /// were made on its ancestors, nearest declaration first per prefix
    pub fn inherited_namespaces(&self) -> Vec<(String, String)> {
        let ancestors = &self.open[..self.open.len().saturating_sub(1)];
        let mut seen: Vec<(String, String)> = Vec::new();
        for scope in ancestors.iter().rev() {
            for (prefix, uri) in &scope.namespaces {
                if !seen.iter().any(|(p, _)| p == prefix) {
                    seen.push((prefix.clone(), uri.clone()));
                }
            }
        }
        seen
    }

    /// Release the byte source. Returns `true` the first time.
    pub fn close(&mut self) -> bool {
        self.input.release()
    }

    /// Whether the byte source has been released
    pub fn is_closed(&self) -> bool {
        self.input.is_released()
    }

    /// Pull the next event
    ///
    /// After `EndDocument` every further call returns `EndDocument` again.
    pub fn next_event(&mut self) -> Result<XmlEvent> {
        if let Some(end) = self.pending_end.take() {
            self.open.pop();
            return Ok(XmlEvent::EndElement(end));
        }
        if self.finished {
            return Ok(XmlEvent::EndDocument);
        }
        if self.input.is_released() {
            return Err(ChunkerError::Closed);
        }
        if !self.started {
            self.start()?;
        }

        loop {
            let base = self.input.position();
            let at_eof = self.input.source_exhausted();
            let step = Tokenizer::new(self.input.buffered(), base, at_eof).next_token()?;
            let (event, consumed, is_empty) = match step {
                Step::NeedMore => {
                    self.input.fill_buffer()?;
                    continue;
                }
                Step::End => return self.finish(base),
                Step::Token(token) => (
                    build_event(&token, base, &self.entities)?,
                    token.span.1,
                    token.kind == TokenKind::EmptyTag,
                ),
            };
            self.input.consume(consumed);

            if let Some(event) = self.accept(event, base)? {
                if is_empty {
                    if let XmlEvent::StartElement(start) = &event {
                        self.pending_end = Some(EndElement::new(start.name.clone()));
                    }
                }
                self.events_read += 1;
                return Ok(event);
            }
        }
    }

    /// Read the first bytes to detect the encoding and skip a byte order mark
    fn start(&mut self) -> Result<()> {
        while self.input.buffered().len() < 4 && self.input.fill_buffer()? {}
        let (encoding, bom) = sniff(self.input.buffered());
        self.input.consume(bom);
        if encoding != UTF_8 {
            self.input.transcode_from(encoding);
        }
        tracing::trace!(encoding = encoding.name(), bom, "xml stream started");
        self.encoding = encoding;
        self.bom_len = bom;
        self.content_start = bom as u64;
        self.started = true;
        Ok(())
    }

    /// Switch decoding to the encoding named by the XML declaration
    fn apply_declared_encoding(&mut self, label: &str, position: u64) -> Result<()> {
        let declared = resolve_declared(label, self.encoding, self.bom_len > 0)
            .map_err(|msg| ParseError::new(msg, position))?;
        if let Some(encoding) = declared {
            tracing::debug!(encoding = encoding.name(), "transcoding declared encoding");
            self.input.transcode_from(encoding);
            self.encoding = encoding;
        }
        Ok(())
    }

    fn finish(&mut self, position: u64) -> Result<XmlEvent> {
        if let Some(innermost) = self.open.last() {
            return Err(ParseError::new(
                format!(
                    "unexpected end of document: {} unclosed element(s), innermost <{}>",
                    self.open.len(),
                    innermost.name
                ),
                position,
            )
            .into());
        }
        if !self.seen_root {
            return Err(ParseError::new("document has no root element", position).into());
        }
        tracing::trace!(bytes = position, "xml stream exhausted");
        self.finished = true;
        Ok(XmlEvent::EndDocument)
    }

    /// Apply well-formedness rules; `None` drops the event (prolog/epilog whitespace)
    fn accept(&mut self, event: XmlEvent, position: u64) -> Result<Option<XmlEvent>> {
        let outside_root = self.open.is_empty();
        match &event {
            XmlEvent::XmlDeclaration { encoding, .. } => {
                if self.events_read > 0 || position != self.content_start {
                    return Err(ParseError::new(
                        "XML declaration allowed only at the start of the document",
                        position,
                    )
                    .into());
                }
                if let Some(label) = encoding {
                    self.apply_declared_encoding(label, position)?;
                }
            }
            XmlEvent::DocType(doctype) => {
                if self.seen_root {
                    return Err(ParseError::new("DOCTYPE must precede the root element", position).into());
                }
                self.entities =
                    EntityTable::from_doctype(doctype).map_err(|msg| ParseError::new(msg, position))?;
            }
            XmlEvent::StartElement(start) => {
                if outside_root && self.seen_root {
                    return Err(ParseError::new(
                        format!("multiple root elements: <{}> follows the root", start.name),
                        position,
                    )
                    .into());
                }
                self.seen_root = true;
                self.open.push(OpenScope {
                    name: start.name.clone(),
                    namespaces: start
                        .namespace_declarations()
                        .map(|(p, u)| (p.to_string(), u.to_string()))
                        .collect(),
                });
            }
            XmlEvent::EndElement(end) => match self.open.pop() {
                None => {
                    return Err(ParseError::new(
                        format!("unexpected end tag </{}>", end.name),
                        position,
                    )
                    .into())
                }
                Some(scope) if scope.name != end.name => {
                    return Err(ParseError::new(
                        format!(
                            "mismatched end tag: expected </{}>, found </{}>",
                            scope.name, end.name
                        ),
                        position,
                    )
                    .into())
                }
                Some(_) => {}
            },
            XmlEvent::Text(text) if outside_root => {
                if !text.bytes().all(is_whitespace) {
                    return Err(ParseError::new("text content outside the root element", position).into());
                }
                return Ok(None);
            }
            XmlEvent::CData(_) if outside_root => {
                return Err(ParseError::new("CDATA section outside the root element", position).into());
            }
            _ => {}
        }
        Ok(Some(event))
    }
}

/// Convert a borrowed token to an owned event
fn build_event(token: &Token<'_>, base: u64, entities: &EntityTable) -> Result<XmlEvent> {
    let at = base + token.span.0 as u64;
    let name = || utf8(token.name.unwrap_or_default(), at);
    let content = || utf8(token.content.unwrap_or_default(), at);

    let event = match token.kind {
        TokenKind::StartTag | TokenKind::EmptyTag => {
            let raw = token.content.unwrap_or_default();
            let attributes = parse_attributes(raw)
                .map_err(|msg| ParseError::new(msg, at))?
                .into_iter()
                .map(|a| {
                    let value = expand(entities, utf8(a.value, at)?, true, at)?;
                    Ok(Attribute::from_source(utf8(a.name, at)?, value, a.quote))
                })
                .collect::<Result<Vec<_>>>()?;
            XmlEvent::StartElement(StartElement::new(name()?, attributes))
        }
        TokenKind::EndTag => XmlEvent::EndElement(EndElement::new(name()?)),
        TokenKind::Text => XmlEvent::Text(expand(entities, content()?, false, at)?),
        TokenKind::CData => XmlEvent::CData(content()?),
        TokenKind::Comment => XmlEvent::Comment(content()?),
        TokenKind::DocType => XmlEvent::DocType(content()?),
        TokenKind::ProcessingInstruction => {
            let data = content()?;
            XmlEvent::ProcessingInstruction {
                target: name()?,
                data: (!data.is_empty()).then_some(data),
            }
        }
        TokenKind::XmlDeclaration => {
            let raw = token.content.unwrap_or_default();
            let pseudo = parse_attributes(raw).map_err(|msg| ParseError::new(msg, at))?;
            let find = |key: &[u8]| {
                pseudo
                    .iter()
                    .find(|a| a.name == key)
                    .map(|a| utf8(a.value, at))
                    .transpose()
            };
            let version = find(&b"version"[..])?
                .ok_or_else(|| ParseError::new("XML declaration requires a version", at))?;
            XmlEvent::XmlDeclaration {
                version,
                encoding: find(&b"encoding"[..])?,
                standalone: find(&b"standalone"[..])?.map(|s| s == "yes"),
            }
        }
    };
    Ok(event)
}

/// Expand declared entity references, keeping the string when there are none
fn expand(entities: &EntityTable, raw: String, in_attribute: bool, at: u64) -> Result<String> {
    let expanded = match entities.expand(&raw, in_attribute) {
        Ok(Cow::Owned(text)) => Some(text),
        Ok(Cow::Borrowed(_)) => None,
        Err(msg) => return Err(ParseError::new(msg, at).into()),
    };
    Ok(expanded.unwrap_or(raw))
}

fn utf8(bytes: &[u8], at: u64) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ParseError::new("invalid UTF-8 in document", at).into())
}
