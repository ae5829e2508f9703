//! XmlChunker - split a streamed XML document into one document per record
//!
//! Given a container path such as `Response/Artists/Artist`, every element at
//! that path is handed back, in document order, as a standalone XML document
//! with its own declaration. The source is read once, forward only, and never
//! held in memory as a whole.
//!
//! Layers:
//! - core: tokenizer and scanning primitives over a byte window
//! - reader: refillable buffer and the well-formedness checking pull reader
//! - writer: serializes reader events into a new document
//! - chunker: container path matching and the pull interface
//! - source / pipeline: byte sources and the record sink loop
//!
//! The crate builds both as a NIF library (`Elixir.XmlChunker.Native`) and as
//! a plain Rust library.

use rustler::{Binary, Encoder, Env, ResourceArc, Term};

mod core;
pub mod chunker;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reader;
mod resource;
pub mod source;
mod term;
pub mod writer;

pub use chunker::{ContainerPath, XmlChunker};
pub use config::ChunkerConfig;
pub use error::{ChunkerError, ParseError, SinkError};
pub use pipeline::{drain_into, drain_source, RecordSink, VecSink};
pub use source::{open_chunker, ByteSource, FileSource, MemorySource};

use resource::{ChunkerRef, ChunkerResource};
use term::{atoms, chunk_to_term, error_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    /// Counts live heap bytes on top of the underlying allocator
    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                PEAK_ALLOCATED.fetch_max(current, Ordering::Relaxed);
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }

    pub fn current() -> usize {
        ALLOCATED.load(Ordering::SeqCst)
    }

    pub fn peak() -> usize {
        PEAK_ALLOCATED.load(Ordering::SeqCst)
    }

    /// Reset the peak to the current figure; returns (current, previous peak)
    pub fn reset() -> (usize, usize) {
        let current = current();
        (current, PEAK_ALLOCATED.swap(current, Ordering::SeqCst))
    }
}

#[cfg(not(feature = "memory_tracking"))]
mod tracking {
    pub fn current() -> usize {
        0
    }

    pub fn peak() -> usize {
        0
    }

    pub fn reset() -> (usize, usize) {
        (0, 0)
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Memory Tracking NIFs
// ============================================================================

/// Live heap bytes (0 without the `memory_tracking` feature)
#[rustler::nif]
fn get_rust_memory() -> usize {
    tracking::current()
}

#[rustler::nif]
fn get_rust_memory_peak() -> usize {
    tracking::peak()
}

#[rustler::nif]
fn reset_rust_memory_stats() -> (usize, usize) {
    tracking::reset()
}

// ============================================================================
// Chunker NIFs
// ============================================================================

fn open_to_term<'a>(env: Env<'a>, source: &dyn ByteSource, container_path: &str) -> Term<'a> {
    match ChunkerResource::open(source, container_path) {
        Ok(resource) => (atoms::ok(), ResourceArc::new(resource)).encode(env),
        Err(err) => error_to_term(env, &err),
    }
}

/// Chunk a document already held by the host, copied once into shared storage
#[rustler::nif(schedule = "DirtyCpu")]
fn chunker_open_binary<'a>(env: Env<'a>, document: Binary<'a>, container_path: &str) -> Term<'a> {
    open_to_term(env, &MemorySource::from_slice(document.as_slice()), container_path)
}

/// Chunk a file, streamed from disk
#[rustler::nif(schedule = "DirtyIo")]
fn chunker_open_file<'a>(env: Env<'a>, path: &str, container_path: &str) -> Term<'a> {
    open_to_term(env, &FileSource::new(path), container_path)
}

/// `{:ok, chunk}`, `:eof` or `{:error, reason}`
#[rustler::nif(schedule = "DirtyIo")]
fn chunker_pull<'a>(env: Env<'a>, chunker: ChunkerRef) -> Term<'a> {
    match chunker.pull() {
        Ok(Some(chunk)) => chunk_to_term(env, &chunk),
        Ok(None) => atoms::eof().encode(env),
        Err(err) => error_to_term(env, &err),
    }
}

#[rustler::nif]
fn chunker_close<'a>(env: Env<'a>, chunker: ChunkerRef) -> Term<'a> {
    match chunker.close() {
        Ok(_) => atoms::ok().encode(env),
        Err(err) => error_to_term(env, &err),
    }
}

/// (chunks emitted, bytes consumed)
#[rustler::nif]
fn chunker_stats(chunker: ChunkerRef) -> (u64, u64) {
    chunker.stats()
}

/// Parse a container path without opening anything
#[rustler::nif]
fn validate_container_path<'a>(env: Env<'a>, path: &str) -> Term<'a> {
    match ContainerPath::parse(path) {
        Ok(parsed) => (atoms::ok(), parsed.segments().to_vec()).encode(env),
        Err(err) => error_to_term(env, &err),
    }
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.XmlChunker.Native");
