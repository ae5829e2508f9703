//! XML Entity Handling
//!
//! Chunks are copied with their character data left in escaped form, so the
//! reader never needs to decode text on the hot path. This module:
//! - checks that every '&' in raw text starts a well-formed reference
//! - decodes predefined and numeric references for accessor methods
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Check that every '&' in raw character data begins a syntactically valid
/// reference (`&name;`, `&#123;` or `&#x7B;`)
///
/// Only the syntax is checked. Whether a named reference is declared is
/// settled when the reader expands it against the DOCTYPE's entities.
pub fn check_references(raw: &[u8]) -> Result<(), &'static str> {
    let mut pos = 0;
    while let Some(offset) = memchr(b'&', &raw[pos..]) {
        let start = pos + offset + 1;
        let semi = memchr(b';', &raw[start..])
            .ok_or("unterminated entity reference")?;
        let body = &raw[start..start + semi];
        match body.first() {
            None => return Err("empty entity reference"),
            Some(b'#') => {
                if decode_numeric(&body[1..]).is_none() {
                    return Err("invalid character reference");
                }
            }
            Some(&first) => {
                let valid_name = super::scanner::is_name_start_char(first)
                    && body.iter().all(|&b| super::scanner::is_name_char(b));
                if !valid_name {
                    return Err("invalid entity reference name");
                }
            }
        }
        pos = start + semi + 1;
    }
    Ok(())
}

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';').and_then(|semi| decode_entity(&after[..semi]).map(|c| (semi, c))) {
            Some((semi, decoded)) => {
                result.push(decoded);
                rest = &after[semi + 1..];
            }
            None => {
                // Unknown entity, keep as-is
                result.push('&');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    Cow::Owned(result)
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric(numeric.as_bytes());
    }
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode the digits of a numeric character reference (after '#')
fn decode_numeric(digits: &[u8]) -> Option<char> {
    let codepoint = match digits.split_first() {
        Some((b'x', hex)) | Some((b'X', hex)) => {
            u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?
        }
        Some(_) => std::str::from_utf8(digits).ok()?.parse::<u32>().ok()?,
        None => return None,
    };
    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}
