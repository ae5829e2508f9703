//! ResourceArc Wrapper
//!
//! Holds one chunker between NIF calls. The mutex serializes calls on the
//! same handle so only one pull is ever in flight.

use crate::chunker::XmlChunker;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::source::{open_chunker, ByteSource};
use rustler::ResourceArc;
use std::io::Read;
use std::sync::Mutex;

/// Chunker over a boxed host-supplied stream
pub type BoxedChunker = XmlChunker<Box<dyn Read + Send>>;

pub struct ChunkerResource {
    pub inner: Mutex<BoxedChunker>,
}

impl ChunkerResource {
    /// Validate the path, then open the source
    pub fn open(source: &dyn ByteSource, container_path: &str) -> Result<Self> {
        let config = ChunkerConfig::from_env().container_path(container_path);
        Ok(ChunkerResource {
            inner: Mutex::new(open_chunker(source, &config)?),
        })
    }

    /// Pull the next chunk
    ///
    /// A lock poisoned by a panic during an earlier pull counts as a failed
    /// chunker.
    pub fn pull(&self) -> Result<Option<String>> {
        let mut chunker = self.inner.lock().map_err(|_| ChunkerError::Poisoned)?;
        chunker.pull_next_xml_chunk()
    }

    /// Close the chunker; the source is released even behind a poisoned lock,
    /// but that case is still reported
    pub fn close(&self) -> Result<bool> {
        match self.inner.lock() {
            Ok(mut chunker) => Ok(chunker.close()),
            Err(poisoned) => {
                let released = poisoned.into_inner().close();
                tracing::warn!(released, "closed chunker behind a poisoned lock");
                Err(ChunkerError::Release(
                    "chunker lock poisoned by an earlier panic".into(),
                ))
            }
        }
    }

    /// (chunks emitted, bytes consumed)
    pub fn stats(&self) -> (u64, u64) {
        let chunker = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        (chunker.chunks_emitted(), chunker.bytes_consumed())
    }
}

#[rustler::resource_impl]
impl rustler::Resource for ChunkerResource {}

/// Type alias for the ResourceArc
pub type ChunkerRef = ResourceArc<ChunkerResource>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use std::sync::Arc;

    const DOC: &str = "<Response><Contacts><Contact>a</Contact><Contact>b</Contact></Contacts></Response>";

    #[test]
    fn test_pull_until_eof() {
        let resource = ChunkerResource::open(&MemorySource::new(DOC), "Response/Contacts/Contact").unwrap();
        assert!(resource.pull().unwrap().is_some());
        assert!(resource.pull().unwrap().is_some());
        assert_eq!(resource.pull().unwrap(), None);
        assert_eq!(resource.stats(), (2, DOC.len() as u64));
        assert!(resource.close().unwrap());
        assert!(!resource.close().unwrap());
    }

    #[test]
    fn test_open_rejects_bad_path() {
        assert!(matches!(
            ChunkerResource::open(&MemorySource::new(DOC), "Response//Contact"),
            Err(ChunkerError::MalformedContainerPath(_))
        ));
    }

    #[test]
    fn test_poisoned_lock() {
        let resource = Arc::new(
            ChunkerResource::open(&MemorySource::new(DOC), "Response/Contacts/Contact").unwrap(),
        );
        let holder = Arc::clone(&resource);
        let _ = std::thread::spawn(move || {
            let _guard = holder.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(resource.pull(), Err(ChunkerError::Poisoned)));
        assert!(matches!(resource.close(), Err(ChunkerError::Release(_))));
        assert!(resource.inner.lock().unwrap_or_else(|p| p.into_inner()).is_closed());
    }
}
