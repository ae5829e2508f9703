//! Container Path
//!
//! A literal, slash-separated list of element local names such as
//! `Response/Artists/Artist`. No wildcards, predicates or namespaces.

use crate::error::{ChunkerError, Result};
use std::fmt;
use std::str::FromStr;

/// Parsed container path, possibly empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerPath {
    segments: Vec<String>,
}

impl ContainerPath {
    /// Parse a raw path string
    ///
    /// Surrounding whitespace and any leading '/' characters are ignored. An
    /// empty result is a valid path that selects the document root.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Ok(ContainerPath::default());
        }

        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if !segments.iter().all(|s| is_valid_segment(s)) {
            return Err(ChunkerError::MalformedContainerPath(raw.to_string()));
        }
        Ok(ContainerPath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Local name of the container element itself
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

/// `[A-Za-z0-9-]+`
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

impl FromStr for ContainerPath {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self> {
        ContainerPath::parse(s)
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let path = ContainerPath::parse("Response/Artists/Artist").unwrap();
        assert_eq!(path.segments(), ["Response", "Artists", "Artist"]);
        assert_eq!(path.len(), 3);
        assert_eq!(path.last(), Some("Artist"));
        assert_eq!(path.to_string(), "Response/Artists/Artist");
    }

    #[test]
    fn test_trims_and_strips_leading_slashes() {
        let path: ContainerPath = "  //Response/Contacts/Contact \n".parse().unwrap();
        assert_eq!(path.segments(), ["Response", "Contacts", "Contact"]);

        let path = ContainerPath::parse("Item-2/x9").unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_empty_path() {
        for raw in ["", "   ", "/", "///"] {
            let path = ContainerPath::parse(raw).unwrap();
            assert!(path.is_empty(), "{raw:?}");
            assert_eq!(path.last(), None);
        }
    }

    #[test]
    fn test_malformed() {
        for raw in ["/Foo//Bar", "Foo/", "Foo/Bar baz", "a:b", "Foo/*", "Foo/Bar[1]", "Ünïcode"] {
            match ContainerPath::parse(raw) {
                Err(ChunkerError::MalformedContainerPath(got)) => assert_eq!(got, raw),
                other => panic!("{raw:?} should be rejected, got {other:?}"),
            }
        }
    }
}
