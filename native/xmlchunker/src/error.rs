//! Error Types
//!
//! Three families of failure reach a chunker's caller:
//! - configuration: the container path is malformed (raised before any I/O)
//! - stream processing: the XML is malformed, the source fails, or a chunk
//!   cannot be written; fatal for the chunker instance
//! - release: the underlying stream could not be released cleanly

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Main error type for chunking operations
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// The container path string failed validation
    #[error("malformed container path: {0:?}")]
    MalformedContainerPath(String),

    /// The reader found the document to be malformed
    #[error("malformed xml stream: {0}")]
    Stream(#[from] ParseError),

    /// Reading from the byte source failed
    #[error("io error reading xml stream: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk could not be produced by the writer
    #[error("unable to write xml chunk: {0}")]
    Writer(String),

    /// A previous call failed; the chunker must not be used again
    #[error("chunker failed earlier and cannot be reused")]
    Poisoned,

    /// The chunker was closed before the document was exhausted
    #[error("chunker is closed")]
    Closed,

    /// Releasing the underlying stream failed
    #[error("unable to release xml stream: {0}")]
    Release(String),

    /// The record sink refused a chunk
    #[error("record sink error: {0}")]
    Sink(#[from] SinkError),
}

impl ChunkerError {
    /// Whether the chunker that raised this error must be discarded
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChunkerError::Stream(_)
                | ChunkerError::Io(_)
                | ChunkerError::Writer(_)
                | ChunkerError::Poisoned
        )
    }

    /// Whether this is a configuration problem detected before any I/O
    pub fn is_configuration(&self) -> bool {
        matches!(self, ChunkerError::MalformedContainerPath(_))
    }
}

/// Syntax error reported by the streaming reader
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at byte {position})")]
pub struct ParseError {
    pub message: String,
    /// Absolute byte offset into the source document
    pub position: u64,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: u64) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// Error raised by a [`crate::pipeline::RecordSink`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ChunkerError::Stream(ParseError::new("bad", 3)).is_fatal());
        assert!(ChunkerError::Poisoned.is_fatal());
        assert!(!ChunkerError::MalformedContainerPath("/a//b".into()).is_fatal());
        assert!(!ChunkerError::Release("gone".into()).is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = ChunkerError::from(ParseError::new("mismatched end tag", 42));
        assert_eq!(
            err.to_string(),
            "malformed xml stream: mismatched end tag (at byte 42)"
        );

        let err = ChunkerError::MalformedContainerPath("Foo//Bar".into());
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "malformed container path: \"Foo//Bar\"");
    }
}
