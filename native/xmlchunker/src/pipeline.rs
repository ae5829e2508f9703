//! Record Pipeline
//!
//! Feeds every chunk of a document into a record sink, one record per chunk,
//! each holding the chunk under a single field name.

use crate::chunker::XmlChunker;
use crate::config::ChunkerConfig;
use crate::error::{Result, SinkError};
use crate::source::{open_chunker, ByteSource};
use std::io::Read;

/// Receives one string value per produced chunk
pub trait RecordSink {
    fn put_record(&mut self, field: &str, value: String) -> std::result::Result<(), SinkError>;
}

/// Sink that keeps every record in memory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VecSink {
    pub records: Vec<(String, String)>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values in arrival order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|(_, v)| v.as_str())
    }
}

impl RecordSink for VecSink {
    fn put_record(&mut self, field: &str, value: String) -> std::result::Result<(), SinkError> {
        self.records.push((field.to_string(), value));
        Ok(())
    }
}

/// Pull chunks until the document is exhausted, forwarding each to `sink`
///
/// The chunker is closed afterwards whether or not an error occurred.
/// Records already handed to the sink stay there. Returns the number of
/// records emitted.
pub fn drain_into<R, S>(chunker: &mut XmlChunker<R>, sink: &mut S, field: &str) -> Result<usize>
where
    R: Read,
    S: RecordSink + ?Sized,
{
    let outcome = forward(chunker, sink, field);
    chunker.close();
    match &outcome {
        Ok(count) => tracing::info!(records = count, field, "record pipeline finished"),
        Err(err) => tracing::warn!(records = chunker.chunks_emitted(), error = %err, "record pipeline aborted"),
    }
    outcome
}

/// Open `source` and drain it into `sink` under the configured field name
pub fn drain_source<S>(source: &dyn ByteSource, config: &ChunkerConfig, sink: &mut S) -> Result<usize>
where
    S: RecordSink + ?Sized,
{
    let mut chunker = open_chunker(source, config)?;
    drain_into(&mut chunker, sink, &config.field_name)
}

fn forward<R, S>(chunker: &mut XmlChunker<R>, sink: &mut S, field: &str) -> Result<usize>
where
    R: Read,
    S: RecordSink + ?Sized,
{
    let mut count = 0;
    while let Some(chunk) = chunker.pull_next_xml_chunk()? {
        sink.put_record(field, chunk)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkerError;
    use crate::source::MemorySource;
    use std::io::Cursor;

    const ARTISTS: &str = "<Response><Artists><Artist>Len Lye</Artist><Artist>Alexander Caulder</Artist><Artist>Marc Chagall</Artist></Artists></Response>";

    fn chunker(xml: &str) -> XmlChunker<Cursor<Vec<u8>>> {
        XmlChunker::new(Cursor::new(xml.as_bytes().to_vec()), "Response/Artists/Artist").unwrap()
    }

    /// Accepts `limit` records, then refuses
    struct LimitedSink {
        inner: VecSink,
        limit: usize,
    }

    impl RecordSink for LimitedSink {
        fn put_record(&mut self, field: &str, value: String) -> std::result::Result<(), SinkError> {
            if self.inner.records.len() == self.limit {
                return Err(SinkError("sink full".into()));
            }
            self.inner.put_record(field, value)
        }
    }

    #[test]
    fn test_drain_into_vec_sink() {
        let mut chunker = chunker(ARTISTS);
        let mut sink = VecSink::new();
        assert_eq!(drain_into(&mut chunker, &mut sink, "xeroxml").unwrap(), 3);
        assert!(chunker.is_closed());
        assert!(sink.records.iter().all(|(field, _)| field == "xeroxml"));
        let values: Vec<&str> = sink.values().collect();
        assert!(values[0].ends_with("<Artist>Len Lye</Artist>"));
        assert!(values[2].ends_with("<Artist>Marc Chagall</Artist>"));
    }

    #[test]
    fn test_drain_source_uses_configured_field() {
        let source = MemorySource::new(ARTISTS);
        let config = ChunkerConfig::new("Response/Artists/Artist").field_name("artist_xml");
        let mut sink = VecSink::new();
        assert_eq!(drain_source(&source, &config, &mut sink).unwrap(), 3);
        assert!(sink.records.iter().all(|(field, _)| field == "artist_xml"));

        let mut sink = VecSink::new();
        let defaults = ChunkerConfig::default().container_path("Response/Artists");
        assert_eq!(drain_source(&source, &defaults, &mut sink).unwrap(), 1);
        assert_eq!(sink.records[0].0, "xeroxml");
    }

    #[test]
    fn test_stream_error_keeps_emitted_records() {
        let truncated = &ARTISTS[..ARTISTS.find("<Artist>Marc").unwrap() + 10];
        let mut chunker = chunker(truncated);
        let mut sink = VecSink::new();
        let err = drain_into(&mut chunker, &mut sink, "xeroxml").unwrap_err();
        assert!(matches!(err, ChunkerError::Stream(_)));
        assert_eq!(sink.records.len(), 2);
        assert!(chunker.is_closed());
    }

    #[test]
    fn test_sink_error_stops_pipeline() {
        let mut chunker = chunker(ARTISTS);
        let mut sink = LimitedSink {
            inner: VecSink::new(),
            limit: 1,
        };
        let err = drain_into(&mut chunker, &mut sink, "xeroxml").unwrap_err();
        assert!(matches!(err, ChunkerError::Sink(_)));
        assert!(!err.is_fatal());
        assert_eq!(sink.inner.records.len(), 1);
        assert!(chunker.is_closed());
    }
}
