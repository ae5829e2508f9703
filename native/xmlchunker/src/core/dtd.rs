//! DOCTYPE Internal Subset
//!
//! A chunk is a standalone document without the source's DOCTYPE, so a
//! reference to an entity declared there would dangle once copied. The
//! reader collects the general entities of the internal subset and expands
//! references to them in character data and attribute values. Element,
//! attribute-list and notation declarations are skipped.

use super::scanner::Scanner;
use memchr::memchr;
use std::borrow::Cow;
use std::collections::HashMap;

/// Nested expansions allowed before a reference is refused
const MAX_EXPANSION_DEPTH: usize = 16;
/// Upper bound on the text produced by expanding one run
const MAX_EXPANDED_LEN: usize = 1 << 20;

const PREDEFINED: [&str; 5] = ["lt", "gt", "amp", "quot", "apos"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntityDecl {
    /// Replacement text, still in escaped form
    Internal(String),
    /// SYSTEM or PUBLIC entity; its content is never fetched
    External,
}

/// General entities declared by the document
#[derive(Debug, Default, Clone)]
pub struct EntityTable {
    entities: HashMap<String, EntityDecl>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Collect the general entities declared in a DOCTYPE's internal subset
    ///
    /// The first declaration of a name wins. Parameter entities are skipped.
    pub fn from_doctype(doctype: &str) -> Result<Self, &'static str> {
        let mut table = EntityTable::new();
        let Some(subset) = internal_subset(doctype.as_bytes()) else {
            return Ok(table);
        };

        let mut s = Scanner::new(subset);
        loop {
            s.skip_whitespace();
            if s.is_eof() {
                break;
            }
            if s.starts_with(b"<!--") {
                let end = s.find_seq(b"-->").ok_or("unterminated comment in DOCTYPE")?;
                s.set_position(end + 3);
            } else if s.starts_with(b"<?") {
                let end = s
                    .find_seq(b"?>")
                    .ok_or("unterminated processing instruction in DOCTYPE")?;
                s.set_position(end + 2);
            } else if s.starts_with(b"<!ENTITY") {
                s.advance(8);
                table.read_entity(&mut s)?;
            } else if s.starts_with(b"<!") {
                let end = s.find_tag_end_quoted().ok_or("unterminated declaration in DOCTYPE")?;
                s.set_position(end + 1);
            } else if s.peek() == Some(b'%') {
                let end = s.find_byte(b';').ok_or("unterminated parameter entity reference")?;
                s.set_position(end + 1);
            } else {
                return Err("unexpected content in DOCTYPE internal subset");
            }
        }
        Ok(table)
    }

    fn read_entity(&mut self, s: &mut Scanner<'_>) -> Result<(), &'static str> {
        s.skip_whitespace();
        let parameter = s.peek() == Some(b'%');
        if parameter {
            s.advance(1);
            s.skip_whitespace();
        }
        let name = s.read_name().ok_or("ENTITY declaration requires a name")?;
        let name = std::str::from_utf8(name).map_err(|_| "invalid entity name")?;
        s.skip_whitespace();

        let decl = match s.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                s.advance(1);
                let end = s.find_byte(quote).ok_or("unterminated entity value")?;
                let value = s.slice(s.position(), end);
                s.set_position(end + 1);
                super::entities::check_references(value)?;
                let value = std::str::from_utf8(value).map_err(|_| "invalid entity value")?;
                EntityDecl::Internal(value.to_string())
            }
            _ if s.starts_with(b"SYSTEM") || s.starts_with(b"PUBLIC") => EntityDecl::External,
            _ => return Err("ENTITY declaration requires a value or external identifier"),
        };

        let end = s.find_tag_end_quoted().ok_or("unterminated ENTITY declaration")?;
        s.set_position(end + 1);
        if !parameter {
            self.entities.entry(name.to_string()).or_insert(decl);
        }
        Ok(())
    }

    /// Replace references to declared entities in escaped character data
    ///
    /// Predefined and character references are kept as written. A reference
    /// to an undeclared, external or recursive entity is an error, as is
    /// replacement text containing markup.
    pub fn expand<'a>(&self, raw: &'a str, in_attribute: bool) -> Result<Cow<'a, str>, String> {
        if memchr(b'&', raw.as_bytes()).is_none() {
            return Ok(Cow::Borrowed(raw));
        }
        let mut out = String::with_capacity(raw.len());
        let mut open = Vec::new();
        self.expand_into(raw, in_attribute, false, &mut out, &mut open)?;
        if out == raw {
            return Ok(Cow::Borrowed(raw));
        }
        Ok(Cow::Owned(out))
    }

    fn expand_into<'t>(
        &'t self,
        raw: &str,
        in_attribute: bool,
        replacement: bool,
        out: &mut String,
        open: &mut Vec<&'t str>,
    ) -> Result<(), String> {
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            push_literal(out, &rest[..amp], in_attribute && replacement);
            let after = &rest[amp + 1..];
            let semi = after
                .find(';')
                .ok_or_else(|| "unterminated entity reference".to_string())?;
            let name = &after[..semi];
            rest = &after[semi + 1..];

            if name.starts_with('#') || PREDEFINED.contains(&name) {
                out.push('&');
                out.push_str(name);
                out.push(';');
                continue;
            }
            let (key, value) = match self.entities.get_key_value(name) {
                None => return Err(format!("undeclared entity reference &{name};")),
                Some((_, EntityDecl::External)) => {
                    return Err(format!("external entity reference &{name}; cannot be expanded"))
                }
                Some((key, EntityDecl::Internal(value))) => (key.as_str(), value),
            };
            if open.contains(&key) {
                return Err(format!("recursive entity reference &{name};"));
            }
            if open.len() >= MAX_EXPANSION_DEPTH {
                return Err(format!("entity &{name}; nested too deeply"));
            }
            if value.contains('<') {
                return Err(format!("entity &{name}; contains markup"));
            }
            open.push(key);
            self.expand_into(value, in_attribute, true, out, open)?;
            open.pop();
            if out.len() > MAX_EXPANDED_LEN {
                return Err(format!("entity expansion exceeds {MAX_EXPANDED_LEN} bytes"));
            }
        }
        push_literal(out, rest, in_attribute && replacement);
        Ok(())
    }
}

/// Replacement text going into a double-quoted attribute needs its quotes escaped
fn push_literal(out: &mut String, text: &str, escape_quotes: bool) {
    if escape_quotes && text.contains('"') {
        out.push_str(&text.replace('"', "&quot;"));
    } else {
        out.push_str(text);
    }
}

/// Bytes between the bracket opening the internal subset and the last `]`
fn internal_subset(doctype: &[u8]) -> Option<&[u8]> {
    let mut quote: Option<u8> = None;
    let mut open = None;
    for (i, &b) in doctype.iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if q == b => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(b),
            (None, b'[') => {
                open = Some(i + 1);
                break;
            }
            _ => {}
        }
    }
    let start = open?;
    let end = doctype.iter().rposition(|&b| b == b']')?;
    (end >= start).then(|| &doctype[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_general_entities() {
        let table = EntityTable::from_doctype(
            "<!DOCTYPE R [\n  <!-- company -->\n  <!ENTITY co \"Acme\">\n  <!ENTITY co 'Other'>\n  \
             <!ENTITY % pe \"ignored\">\n  %pe;\n  <!ELEMENT R (C)*>\n  <!ATTLIST C x CDATA \"a>b\">\n  \
             <!ENTITY logo SYSTEM \"logo.gif\">\n]>",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.expand("&co;", false).unwrap(), "Acme");
        assert_eq!(
            table.expand("&logo;", false).unwrap_err(),
            "external entity reference &logo; cannot be expanded"
        );
    }

    #[test]
    fn test_no_internal_subset() {
        assert!(EntityTable::from_doctype("<!DOCTYPE R SYSTEM \"r[1].dtd\">").unwrap().is_empty());
        assert!(EntityTable::from_doctype("<!DOCTYPE R>").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_subset() {
        assert_eq!(
            EntityTable::from_doctype("<!DOCTYPE R [<!ENTITY co>]>").unwrap_err(),
            "ENTITY declaration requires a value or external identifier"
        );
        assert_eq!(
            EntityTable::from_doctype("<!DOCTYPE R [junk]>").unwrap_err(),
            "unexpected content in DOCTYPE internal subset"
        );
    }

    #[test]
    fn test_expand_keeps_predefined_and_nested() {
        let table = EntityTable::from_doctype(
            "<!DOCTYPE R [<!ENTITY co \"Acme &amp; Sons\"><!ENTITY full \"&co; Ltd &#169;\">]>",
        )
        .unwrap();
        assert!(matches!(table.expand("no refs", false).unwrap(), Cow::Borrowed(_)));
        assert!(matches!(table.expand("a &lt; b", false).unwrap(), Cow::Borrowed(_)));
        assert_eq!(table.expand("[&full;]", false).unwrap(), "[Acme &amp; Sons Ltd &#169;]");
    }

    #[test]
    fn test_expand_in_attribute_escapes_quotes() {
        let table = EntityTable::from_doctype("<!DOCTYPE R [<!ENTITY q '\"quoted\"'>]>").unwrap();
        assert_eq!(table.expand("&q;", true).unwrap(), "&quot;quoted&quot;");
        assert_eq!(table.expand("&q;", false).unwrap(), "\"quoted\"");
    }

    #[test]
    fn test_expand_errors() {
        let table = EntityTable::from_doctype(
            "<!DOCTYPE R [<!ENTITY a \"&b;\"><!ENTITY b \"&a;\"><!ENTITY tag \"<b>x</b>\">]>",
        )
        .unwrap();
        assert_eq!(table.expand("&nope;", false).unwrap_err(), "undeclared entity reference &nope;");
        assert_eq!(table.expand("&a;", false).unwrap_err(), "recursive entity reference &a;");
        assert_eq!(table.expand("&tag;", false).unwrap_err(), "entity &tag; contains markup");
        assert_eq!(
            EntityTable::new().expand("&co;", false).unwrap_err(),
            "undeclared entity reference &co;"
        );
    }

    #[test]
    fn test_expansion_is_bounded() {
        let mut doctype = String::from("<!DOCTYPE R [<!ENTITY l0 \"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx\">");
        for level in 1..10 {
            let refs = format!("&l{};", level - 1).repeat(10);
            doctype.push_str(&format!("<!ENTITY l{level} \"{refs}\">"));
        }
        doctype.push_str("]>");
        let table = EntityTable::from_doctype(&doctype).unwrap();
        assert!(table.expand("&l9;", false).unwrap_err().starts_with("entity expansion exceeds"));
    }
}
