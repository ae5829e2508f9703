//! Buffered XML Reader
//!
//! Reads XML from any source implementing Read trait, keeping a window of
//! unconsumed bytes. The window is compacted on every refill and only grows
//! when a single token is larger than it, so memory stays bounded by the
//! biggest token rather than the document.
//!
//! A document that is not UTF-8 is transcoded refill by refill once
//! [`BufferedReader::transcode_from`] is called. From then on the window
//! holds UTF-8 and offsets count UTF-8 bytes.

use encoding_rs::{Decoder, DecoderResult, Encoding};
use std::io::{self, ErrorKind, Read};

/// Buffer size for reading chunks
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Free window space kept while transcoding, enough for any decoded character
const MIN_DECODE_SPACE: usize = 16;

/// Buffered window over a byte source
pub struct BufferedReader<R: Read> {
    /// `None` once released
    reader: Option<R>,
    buffer: Vec<u8>,
    pos: usize,
    end: usize,
    eof: bool,
    /// Bytes consumed before the current window start
    consumed: u64,
    transcoder: Option<Transcoder>,
}

/// Raw source bytes waiting to be decoded into the window
struct Transcoder {
    decoder: Decoder,
    raw: Vec<u8>,
    raw_pos: usize,
    raw_end: usize,
    source_done: bool,
    finished: bool,
}

impl Transcoder {
    fn new(encoding: &'static Encoding, pending: &[u8], capacity: usize, source_done: bool) -> Self {
        let mut raw = vec![0u8; capacity.max(pending.len())];
        raw[..pending.len()].copy_from_slice(pending);
        Transcoder {
            decoder: encoding.new_decoder_without_bom_handling(),
            raw,
            raw_pos: 0,
            raw_end: pending.len(),
            source_done,
            finished: false,
        }
    }

    /// Decode into `dst`, reading the source as needed; `Ok(0)` at the end
    fn decode_into<R: Read>(&mut self, reader: &mut R, dst: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.finished {
                return Ok(0);
            }
            if self.raw_pos == self.raw_end && !self.source_done {
                self.raw_pos = 0;
                self.raw_end = 0;
                loop {
                    match reader.read(&mut self.raw) {
                        Ok(0) => self.source_done = true,
                        Ok(read) => self.raw_end = read,
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e),
                    }
                    break;
                }
            }

            let last = self.source_done;
            let (result, read, written) = self.decoder.decode_to_utf8_without_replacement(
                &self.raw[self.raw_pos..self.raw_end],
                dst,
                last,
            );
            self.raw_pos += read;
            match result {
                DecoderResult::Malformed(_, _) => {
                    return Err(io::Error::new(
                        ErrorKind::InvalidData,
                        format!("malformed {} byte sequence", self.decoder.encoding().name()),
                    ))
                }
                DecoderResult::InputEmpty if last => {
                    self.finished = true;
                    return Ok(written);
                }
                DecoderResult::OutputFull if written == 0 => {
                    return Err(io::Error::other("no window space left to decode into"))
                }
                _ if written > 0 => return Ok(written),
                _ => {}
            }
        }
    }
}

impl<R: Read> BufferedReader<R> {
    /// Create a new buffered reader
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new buffered reader with specified buffer capacity
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        BufferedReader {
            reader: Some(reader),
            buffer: vec![0u8; capacity.max(16)],
            pos: 0,
            end: 0,
            eof: false,
            consumed: 0,
            transcoder: None,
        }
    }

    /// Read more data into the window
    ///
    /// Returns `Ok(false)` once the source is exhausted (or released).
    pub fn fill_buffer(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        let Some(reader) = self.reader.as_mut() else {
            self.eof = true;
            return Ok(false);
        };

        // Compact: move remaining data to start
        if self.pos > 0 {
            self.buffer.copy_within(self.pos..self.end, 0);
            self.end -= self.pos;
            self.pos = 0;
        }

        // Grow only when a single token fills the whole window
        let min_free = if self.transcoder.is_some() { MIN_DECODE_SPACE } else { 1 };
        if self.buffer.len() - self.end < min_free {
            let grown = (self.buffer.len() * 2).max(self.end + min_free);
            self.buffer.resize(grown, 0);
        }

        if let Some(transcoder) = self.transcoder.as_mut() {
            let written = transcoder.decode_into(reader, &mut self.buffer[self.end..])?;
            if written == 0 {
                self.eof = true;
                return Ok(false);
            }
            self.end += written;
            return Ok(true);
        }

        loop {
            match reader.read(&mut self.buffer[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(read) => {
                    self.end += read;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Decode everything not yet consumed from `encoding` into UTF-8
    ///
    /// The unconsumed window is treated as raw bytes of that encoding.
    /// Returns `false` if a decoder is already in place or the source was
    /// released.
    pub fn transcode_from(&mut self, encoding: &'static Encoding) -> bool {
        if self.transcoder.is_some() || self.reader.is_none() {
            return false;
        }
        self.transcoder = Some(Transcoder::new(
            encoding,
            &self.buffer[self.pos..self.end],
            self.buffer.len(),
            self.eof,
        ));
        self.end = self.pos;
        self.eof = false;
        true
    }

    /// Get current buffered data as a slice
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..self.end]
    }

    /// Whether the source has no more bytes beyond the window
    pub fn source_exhausted(&self) -> bool {
        self.eof
    }

    /// Check if we've reached end of input
    pub fn is_eof(&self) -> bool {
        self.eof && self.pos >= self.end
    }

    /// Consume n bytes from the window
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.end - self.pos);
        self.pos += n;
        self.consumed += n as u64;
    }

    /// Absolute offset of the window start in the source
    pub fn position(&self) -> u64 {
        self.consumed
    }

    /// Current window capacity
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Drop the underlying source; later fills report end of input
    ///
    /// Returns `true` if the source was still held.
    pub fn release(&mut self) -> bool {
        self.eof = true;
        self.pos = 0;
        self.end = 0;
        self.transcoder = None;
        self.reader.take().is_some()
    }

    /// Whether the source has been released
    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }
}
