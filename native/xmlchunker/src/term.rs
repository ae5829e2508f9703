//! Term Conversion
//!
//! Builds the reply terms the NIF functions hand back to the BEAM.

use crate::error::ChunkerError;
use rustler::{Encoder, Env, NewBinary, Term};

pub mod atoms {
    // Pre-defined atoms for efficiency - created once at compile time
    rustler::atoms! {
        ok,
        error,
        eof,
    }
}

/// Copy bytes into a new BEAM binary
pub fn bytes_to_binary<'a>(env: Env<'a>, bytes: &[u8]) -> Term<'a> {
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// `{:ok, chunk}` with the chunk as a binary
pub fn chunk_to_term<'a>(env: Env<'a>, chunk: &str) -> Term<'a> {
    (atoms::ok(), bytes_to_binary(env, chunk.as_bytes())).encode(env)
}

/// Reason string reported to the host for an error
///
/// Closed and failed handles get fixed reasons the host can match on; every
/// other error carries its message.
pub fn error_reason(err: &ChunkerError) -> String {
    match err {
        ChunkerError::Closed => "chunker_closed".to_string(),
        ChunkerError::Poisoned => "chunker_failed".to_string(),
        other => other.to_string(),
    }
}

/// `{:error, reason}`
pub fn error_to_term<'a>(env: Env<'a>, err: &ChunkerError) -> Term<'a> {
    (atoms::error(), error_reason(err)).encode(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    #[test]
    fn test_error_reason() {
        assert_eq!(error_reason(&ChunkerError::Closed), "chunker_closed");
        assert_eq!(error_reason(&ChunkerError::Poisoned), "chunker_failed");
        assert_eq!(
            error_reason(&ParseError::new("mismatched end tag", 9).into()),
            "malformed xml stream: mismatched end tag (at byte 9)"
        );
    }
}
