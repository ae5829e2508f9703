//! Byte Sources
//!
//! Where a chunker's document comes from. The chunker only needs a forward
//! `Read`; how the bytes were fetched (network, signing, caching) stays on
//! the host's side of this trait.

use crate::chunker::XmlChunker;
use crate::config::ChunkerConfig;
use crate::error::Result;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies a readable stream positioned at the start of an XML document
pub trait ByteSource: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// A document on the local filesystem, streamed rather than read whole
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A document already in memory; every `open` starts from the beginning
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        MemorySource {
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Copy a borrowed document straight into shared storage
    pub fn from_slice(bytes: &[u8]) -> Self {
        MemorySource {
            bytes: Arc::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ByteSource for MemorySource {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }

    fn describe(&self) -> String {
        format!("<{} bytes in memory>", self.bytes.len())
    }
}

/// Open `source` and wrap it in a chunker
///
/// The container path is checked first, so a bad path never opens the source.
pub fn open_chunker(
    source: &dyn ByteSource,
    config: &ChunkerConfig,
) -> Result<XmlChunker<Box<dyn Read + Send>>> {
    config.validate()?;
    let stream = source.open()?;
    tracing::debug!(source = %source.describe(), "opened xml source");
    XmlChunker::with_config(stream, config)
}
