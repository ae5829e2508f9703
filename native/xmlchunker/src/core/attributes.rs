//! XML Attribute Parsing
//!
//! Splits the raw attribute text of a start tag into name/value pairs.
//! Values stay in their escaped source form so they can be written back
//! out unchanged.

use super::entities::check_references;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};

/// An attribute as it appears in the source, borrowed from the read window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a [u8],
    /// Value between the quotes, entities not decoded
    pub value: &'a [u8],
    /// The quote character that delimited the value
    pub quote: u8,
}

/// Parse attributes from raw tag content (after the element name)
///
/// Input should be the content between element name and '>' or '/>'.
/// Returns the offset-free error message on the first malformed attribute.
pub fn parse_attributes(input: &[u8]) -> Result<Vec<RawAttribute<'_>>, &'static str> {
    let mut attrs: Vec<RawAttribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }
        if !attrs.is_empty() && pos == ws_start {
            return Err("whitespace required between attributes");
        }

        // Attribute name
        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            return Err("attribute name must start with letter, underscore, or colon");
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        // Skip whitespace around '='
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if input.get(pos) != Some(&b'=') {
            return Err("attribute value required");
        }
        pos += 1;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        let quote = match input.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err("attribute value must be quoted"),
        };
        pos += 1;
        let value_start = pos;
        while pos < input.len() && input[pos] != quote {
            if input[pos] == b'<' {
                return Err("attribute value cannot contain '<'");
            }
            pos += 1;
        }
        if pos >= input.len() {
            return Err("attribute value has mismatched quotes");
        }
        let value = &input[value_start..pos];
        pos += 1; // Skip closing quote

        check_references(value)?;
        if attrs.iter().any(|a| a.name == name) {
            return Err("duplicate attribute");
        }
        attrs.push(RawAttribute { name, value, quote });
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" id=\"test\" class=\"foo\"").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, b"id");
        assert_eq!(attrs[0].value, b"test");
        assert_eq!(attrs[1].name, b"class");
        assert_eq!(attrs[1].value, b"foo");
    }

    #[test]
    fn test_single_quoted_keeps_inner_double_quote() {
        let attrs = parse_attributes(b" title='say \"hi\"'").unwrap();
        assert_eq!(attrs[0].value, b"say \"hi\"");
        assert_eq!(attrs[0].quote, b'\'');
    }

    #[test]
    fn test_entity_left_escaped() {
        let attrs = parse_attributes(b" title=\"&lt;hello&gt;\"").unwrap();
        assert_eq!(attrs[0].value, b"&lt;hello&gt;");
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes(b"  id  =  \"test\"  ").unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, b"id");
        assert_eq!(attrs[0].value, b"test");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_attributes(b"").unwrap().is_empty());
        assert!(parse_attributes(b"   ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_attributes() {
        assert_eq!(parse_attributes(b" checked"), Err("attribute value required"));
        assert_eq!(parse_attributes(b" a=1"), Err("attribute value must be quoted"));
        assert_eq!(parse_attributes(b" a=\"1"), Err("attribute value has mismatched quotes"));
        assert_eq!(parse_attributes(b" a=\"1\" a=\"2\""), Err("duplicate attribute"));
        assert_eq!(parse_attributes(b" a=\"1\"b=\"2\""), Err("whitespace required between attributes"));
        assert_eq!(parse_attributes(b" a=\"x<y\""), Err("attribute value cannot contain '<'"));
        assert_eq!(parse_attributes(b" a=\"x & y\""), Err("unterminated entity reference"));
    }
}
