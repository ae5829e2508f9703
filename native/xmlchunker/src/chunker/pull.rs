//! Pull-based XML Chunker
//!
//! Scans a streamed document for elements at the configured container path
//! and hands each one back as its own XML document, in document order. Only
//! the current token and the chunk being built are held in memory.

use super::path::ContainerPath;
use super::stack::{matches, ElementStack};
use super::subtree::reserialize;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::reader::{XmlEvent, XmlStreamReader};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkerState {
    /// Looking for the next container start
    Scanning,
    /// The document has ended
    Exhausted,
    /// A stream processing error was raised
    Failed,
}

/// Splits one XML stream into one document per container element
pub struct XmlChunker<R: Read> {
    reader: XmlStreamReader<R>,
    path: ContainerPath,
    stack: ElementStack,
    state: ChunkerState,
    closed: bool,
    chunks_emitted: u64,
}

impl<R: Read> XmlChunker<R> {
    /// Create a chunker over `source`
    ///
    /// The path is validated before anything is read from `source`.
    pub fn new(source: R, container_path: &str) -> Result<Self> {
        let path = ContainerPath::parse(container_path)?;
        Ok(Self::from_path(source, path))
    }

    /// Create a chunker with an already parsed path
    pub fn from_path(source: R, path: ContainerPath) -> Self {
        Self::build(XmlStreamReader::new(source), path)
    }

    /// Create a chunker from host settings
    pub fn with_config(source: R, config: &ChunkerConfig) -> Result<Self> {
        let path = config.validate()?;
        Ok(Self::build(
            XmlStreamReader::with_capacity(source, config.read_buffer),
            path,
        ))
    }

    fn build(reader: XmlStreamReader<R>, path: ContainerPath) -> Self {
        tracing::debug!(container_path = %path, "xml chunker opened");
        XmlChunker {
            reader,
            path,
            stack: ElementStack::new(),
            state: ChunkerState::Scanning,
            closed: false,
            chunks_emitted: 0,
        }
    }

    pub fn container_path(&self) -> &ContainerPath {
        &self.path
    }

    /// Number of chunks returned so far
    pub fn chunks_emitted(&self) -> u64 {
        self.chunks_emitted
    }

    /// Bytes read from the source and processed so far
    pub fn bytes_consumed(&self) -> u64 {
        self.reader.bytes_consumed()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ChunkerState::Exhausted
    }

    pub fn is_failed(&self) -> bool {
        self.state == ChunkerState::Failed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Return the next chunk, or `None` once the document is exhausted
    ///
    /// After `None` every later call returns `None` without reading. After a
    /// fatal error every later call returns [`ChunkerError::Poisoned`].
    pub fn pull_next_xml_chunk(&mut self) -> Result<Option<String>> {
        match self.state {
            ChunkerState::Exhausted => return Ok(None),
            ChunkerState::Failed => return Err(ChunkerError::Poisoned),
            ChunkerState::Scanning => {}
        }
        if self.closed {
            return Err(ChunkerError::Closed);
        }

        self.scan().inspect_err(|err| {
            if err.is_fatal() {
                tracing::warn!(
                    container_path = %self.path,
                    chunks = self.chunks_emitted,
                    error = %err,
                    "xml chunker failed"
                );
                self.state = ChunkerState::Failed;
            }
        })
    }

    fn scan(&mut self) -> Result<Option<String>> {
        loop {
            match self.reader.next_event()? {
                XmlEvent::EndDocument => {
                    self.state = ChunkerState::Exhausted;
                    tracing::info!(
                        container_path = %self.path,
                        chunks = self.chunks_emitted,
                        bytes = self.bytes_consumed(),
                        "xml stream exhausted"
                    );
                    return Ok(None);
                }
                XmlEvent::EndElement(_) => {
                    self.stack.pop();
                }
                XmlEvent::StartElement(start) => {
                    self.stack.push(start.local_name());
                    if matches(&self.stack, &self.path) {
                        let chunk = reserialize(&mut self.reader, &mut self.stack, &start)?;
                        self.chunks_emitted += 1;
                        tracing::debug!(
                            index = self.chunks_emitted,
                            len = chunk.len(),
                            "xml chunk emitted"
                        );
                        return Ok(Some(chunk));
                    }
                }
                _ => {}
            }
        }
    }

    /// Release the byte source
    ///
    /// Safe to call any number of times; returns `true` only for the call
    /// that released the source.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        let released = self.reader.close();
        tracing::info!(
            container_path = %self.path,
            chunks = self.chunks_emitted,
            bytes = self.bytes_consumed(),
            "xml chunker closed"
        );
        released
    }
}

/// Yields chunks until the document is exhausted or the first error
impl<R: Read> Iterator for XmlChunker<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed || self.state == ChunkerState::Failed {
            return None;
        }
        self.pull_next_xml_chunk().transpose()
    }
}
