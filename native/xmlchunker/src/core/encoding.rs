//! XML Encoding Detection
//!
//! Chunks are handed out as UTF-8 strings; any other input encoding is
//! transcoded as it is read. The encoding is settled in two steps:
//! - the byte order mark, or the `<` / NUL pattern of BOM-less UTF-16
//! - the `encoding=` pseudo-attribute of the XML declaration, which may
//!   switch an ASCII-compatible document to a single-byte encoding
//!
//! Labels are resolved with `encoding_rs`, which follows the WHATWG
//! Encoding Standard (so `ISO-8859-1` decodes as windows-1252).

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// Encoding implied by the first bytes of a document, and the BOM length
pub fn sniff(input: &[u8]) -> (&'static Encoding, usize) {
    if let Some(found) = Encoding::for_bom(input) {
        return found;
    }
    match input {
        [b'<', 0x00, ..] => (UTF_16LE, 0),
        [0x00, b'<', ..] => (UTF_16BE, 0),
        _ => (UTF_8, 0),
    }
}

fn is_utf16(encoding: &'static Encoding) -> bool {
    encoding == UTF_16LE || encoding == UTF_16BE
}

/// Check a declared encoding against the one sniffed from the first bytes
///
/// Returns the encoding to switch to for the rest of the document, or
/// `None` when the current one already applies. A byte order mark or the
/// UTF-16 byte pattern settles the encoding; the declaration must agree.
pub fn resolve_declared(
    label: &str,
    detected: &'static Encoding,
    from_bom: bool,
) -> Result<Option<&'static Encoding>, String> {
    let declared = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| format!("unsupported encoding {label:?}"))?;

    if from_bom || is_utf16(detected) {
        return if declared == detected || (is_utf16(declared) && is_utf16(detected)) {
            Ok(None)
        } else {
            Err(format!(
                "document declares encoding {label:?} but is encoded as {}",
                detected.name()
            ))
        };
    }
    if declared == UTF_8 {
        return Ok(None);
    }
    if is_utf16(declared) {
        return Err(format!(
            "document declares encoding {label:?} but is not UTF-16 encoded"
        ));
    }
    if !declared.is_ascii_compatible() {
        return Err(format!("unsupported encoding {label:?}"));
    }
    Ok(Some(declared))
}
