//! Chunker Configuration
//!
//! Settings a host supplies when it opens a chunker. Defaults match the
//! contact export the chunker was first used for.

use crate::chunker::ContainerPath;
use crate::error::Result;
use crate::reader::buffered::DEFAULT_BUFFER_SIZE;

pub const DEFAULT_CONTAINER_PATH: &str = "Response/Contacts/Contact";
pub const DEFAULT_FIELD_NAME: &str = "xeroxml";

pub const ENV_CONTAINER_PATH: &str = "XMLCHUNKER_CONTAINER_PATH";
pub const ENV_FIELD_NAME: &str = "XMLCHUNKER_FIELD_NAME";
pub const ENV_READ_BUFFER: &str = "XMLCHUNKER_READ_BUFFER";

/// Runtime settings for one chunker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Raw container path, parsed when the chunker is built
    pub container_path: String,
    /// Record field each chunk is stored under
    pub field_name: String,
    /// Initial read window in bytes
    pub read_buffer: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            container_path: DEFAULT_CONTAINER_PATH.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            read_buffer: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ChunkerConfig {
    pub fn new(container_path: impl Into<String>) -> Self {
        ChunkerConfig {
            container_path: container_path.into(),
            ..Default::default()
        }
    }

    pub fn container_path(mut self, path: impl Into<String>) -> Self {
        self.container_path = path.into();
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    pub fn read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer = bytes;
        self
    }

    /// Parse the container path
    pub fn validate(&self) -> Result<ContainerPath> {
        ContainerPath::parse(&self.container_path)
    }

    /// Defaults overridden by `XMLCHUNKER_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ChunkerConfig::default();
        if let Some(path) = lookup(ENV_CONTAINER_PATH) {
            config.container_path = path;
        }
        if let Some(field) = lookup(ENV_FIELD_NAME).filter(|f| !f.trim().is_empty()) {
            config.field_name = field;
        }
        if let Some(raw) = lookup(ENV_READ_BUFFER) {
            match raw.trim().parse::<usize>() {
                Ok(bytes) if bytes > 0 => config.read_buffer = bytes,
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", ENV_READ_BUFFER),
            }
        }
        config
    }
}
