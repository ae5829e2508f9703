//! XML Tokenizer - extracts one token at a time from a buffered window
//!
//! The window is whatever part of the document the reader currently holds.
//! A token that runs past the end of the window is reported as
//! [`Step::NeedMore`] so the caller can refill and retry; once the source is
//! exhausted the same situation is a syntax error instead.
//!
//! Token kinds:
//! - Element start/end/empty tags
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations (internal subset kept opaque)

use super::entities::check_references;
use super::scanner::{is_whitespace, Scanner};
use crate::error::ParseError;
use memchr::memmem;

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Element end tag: </element>
    EndTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
}

/// A token borrowed from the current window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in the window (start, end)
    pub span: (usize, usize),
    /// Element name or PI target
    pub name: Option<&'a [u8]>,
    /// Raw attribute text for tags, body for text/CDATA/comments/PIs,
    /// the whole declaration for DOCTYPE
    pub content: Option<&'a [u8]>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: &'a [u8]) -> Self {
        self.content = Some(content);
        self
    }
}

/// Outcome of asking for the next token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<'a> {
    /// A complete token
    Token(Token<'a>),
    /// The window ends inside a token; refill and retry
    NeedMore,
    /// Window empty and source exhausted
    End,
}

/// Result of comparing the window against a markup literal
enum Literal {
    Matches,
    Partial,
    Differs,
}

/// Single-token XML tokenizer over a buffered window
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    /// Absolute offset of the window's first byte in the document
    base: u64,
    /// Whether the source has nothing beyond this window
    at_eof: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer for `window`, which starts `base` bytes into the document
    pub fn new(window: &'a [u8], base: u64, at_eof: bool) -> Self {
        Tokenizer {
            scanner: Scanner::new(window),
            base,
            at_eof,
        }
    }

    /// Get the next token from the start of the window
    pub fn next_token(&mut self) -> Result<Step<'a>, ParseError> {
        if self.scanner.is_eof() {
            return Ok(if self.at_eof { Step::End } else { Step::NeedMore });
        }

        match self.scanner.peek() {
            Some(b'<') => self.parse_markup(),
            _ => self.parse_text(),
        }
    }

    fn error(&self, message: impl Into<String>, at: usize) -> ParseError {
        ParseError::new(message, self.base + at as u64)
    }

    /// The window ended before `what` was complete
    fn need_more(&self, what: &str, start: usize) -> Result<Step<'a>, ParseError> {
        if self.at_eof {
            Err(self.error(format!("unexpected end of document inside {what}"), start))
        } else {
            Ok(Step::NeedMore)
        }
    }

    fn literal(&self, literal: &[u8]) -> Literal {
        let rem = self.scanner.remaining();
        if self.scanner.starts_with(literal) {
            Literal::Matches
        } else if rem.len() < literal.len() && literal.starts_with(rem) {
            Literal::Partial
        } else {
            Literal::Differs
        }
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self) -> Result<Step<'a>, ParseError> {
        let start = self.scanner.position();
        match self.scanner.peek_at(1) {
            None => self.need_more("markup", start),
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Result<Step<'a>, ParseError> {
        self.scanner.advance(1); // Skip '<'

        // Find the end of the tag, handling quoted attributes
        let end = match self.scanner.find_tag_end_quoted() {
            Some(end) => end,
            None => return self.need_more("start tag", start),
        };

        let name = self.scanner.read_name().ok_or_else(|| {
            self.error(
                "invalid element name: must start with letter, underscore, or colon",
                start,
            )
        })?;
        let name_end = self.scanner.position();

        match self.scanner.peek() {
            Some(b) if b == b'>' || b == b'/' || is_whitespace(b) => {}
            _ => return Err(self.error("invalid character in element name", name_end)),
        }

        // '/' directly before '>' marks an empty element
        let is_empty = end > name_end && self.scanner.slice(end - 1, end) == b"/";
        let attrs_end = if is_empty { end - 1 } else { end };
        let attrs = self.scanner.slice(name_end, attrs_end);

        self.scanner.set_position(end + 1);
        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Step::Token(
            Token::new(kind, (start, end + 1))
                .with_name(name)
                .with_content(attrs),
        ))
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Result<Step<'a>, ParseError> {
        self.scanner.advance(2); // Skip '</'

        let end = match self.scanner.find_byte(b'>') {
            Some(end) => end,
            None => return self.need_more("end tag", start),
        };

        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error("invalid element name in end tag", start))?;

        // Only whitespace may follow the name
        self.scanner.skip_whitespace();
        if self.scanner.position() != end {
            return Err(self.error("end tag cannot have attributes or other content", start));
        }

        self.scanner.set_position(end + 1);
        Ok(Step::Token(
            Token::new(TokenKind::EndTag, (start, end + 1)).with_name(name),
        ))
    }

    /// Parse markup starting with '<!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Result<Step<'a>, ParseError> {
        let mut partial = false;
        for (literal, kind) in [
            (&b"<!--"[..], TokenKind::Comment),
            (&b"<![CDATA["[..], TokenKind::CData),
            (&b"<!DOCTYPE"[..], TokenKind::DocType),
        ] {
            match self.literal(literal) {
                Literal::Matches => {
                    self.scanner.advance(literal.len());
                    return match kind {
                        TokenKind::Comment => self.parse_comment(start),
                        TokenKind::CData => self.parse_cdata(start),
                        _ => self.parse_doctype(start),
                    };
                }
                Literal::Partial => partial = true,
                Literal::Differs => {}
            }
        }

        if partial {
            self.need_more("markup declaration", start)
        } else {
            Err(self.error("invalid declaration - expected comment, CDATA, or DOCTYPE", start))
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Result<Step<'a>, ParseError> {
        let content_start = self.scanner.position();
        let end = match self.scanner.find_seq(b"-->") {
            Some(end) => end,
            None => return self.need_more("comment", start),
        };

        let content = self.scanner.slice(content_start, end);
        if memmem::find(content, b"--").is_some() || content.ends_with(b"-") {
            return Err(self.error("'--' is not allowed inside a comment", start));
        }

        self.scanner.set_position(end + 3);
        Ok(Step::Token(
            Token::new(TokenKind::Comment, (start, end + 3)).with_content(content),
        ))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Result<Step<'a>, ParseError> {
        let content_start = self.scanner.position();
        let end = match self.scanner.find_seq(b"]]>") {
            Some(end) => end,
            None => return self.need_more("CDATA section", start),
        };

        let content = self.scanner.slice(content_start, end);
        self.scanner.set_position(end + 3);
        Ok(Step::Token(
            Token::new(TokenKind::CData, (start, end + 3)).with_content(content),
        ))
    }

    /// Parse a DOCTYPE declaration, internal subset included
    fn parse_doctype(&mut self, start: usize) -> Result<Step<'a>, ParseError> {
        match self.scanner.peek() {
            None => return self.need_more("DOCTYPE declaration", start),
            Some(b) if is_whitespace(b) => {}
            Some(_) => return Err(self.error("whitespace required after DOCTYPE", start)),
        }

        let end = match self.scanner.find_doctype_end() {
            Some(end) => end,
            None => return self.need_more("DOCTYPE declaration", start),
        };

        self.scanner.skip_whitespace();
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error("DOCTYPE declaration requires a name", start))?;

        let whole = self.scanner.slice(start, end + 1);
        self.scanner.set_position(end + 1);
        Ok(Step::Token(
            Token::new(TokenKind::DocType, (start, end + 1))
                .with_name(name)
                .with_content(whole),
        ))
    }

    /// Parse a processing instruction or the XML declaration
    fn parse_pi(&mut self, start: usize) -> Result<Step<'a>, ParseError> {
        self.scanner.advance(2); // Skip '<?'

        let end = match self.scanner.find_seq(b"?>") {
            Some(end) => end,
            None => return self.need_more("processing instruction", start),
        };

        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error("invalid processing instruction target", start))?;

        // After the target: whitespace or the closing '?>'
        let target_end = self.scanner.position();
        if target_end != end && !self.scanner.peek().is_some_and(is_whitespace) {
            return Err(self.error("invalid character after processing instruction target", target_end));
        }
        self.scanner.skip_whitespace();
        let data_start = self.scanner.position().min(end);
        let data = self.scanner.slice(data_start, end);

        let kind = if target == b"xml" {
            TokenKind::XmlDeclaration
        } else if target.eq_ignore_ascii_case(b"xml") {
            return Err(self.error(
                "processing instruction target cannot be 'xml' (case-insensitive reserved name)",
                start,
            ));
        } else {
            TokenKind::ProcessingInstruction
        };

        self.scanner.set_position(end + 2);
        Ok(Step::Token(
            Token::new(kind, (start, end + 2))
                .with_name(target)
                .with_content(data),
        ))
    }

    /// Parse text content up to the next '<'
    fn parse_text(&mut self) -> Result<Step<'a>, ParseError> {
        let start = self.scanner.position();
        let end = match self.scanner.find_byte(b'<') {
            Some(end) => end,
            // Text at the end of the source runs to the end of the window
            None if self.at_eof => start + self.scanner.remaining().len(),
            None => return Ok(Step::NeedMore),
        };

        let content = self.scanner.slice(start, end);
        if memmem::find(content, b"]]>").is_some() {
            return Err(self.error("']]>' is not allowed in text content", start));
        }
        check_references(content).map_err(|msg| self.error(msg, start))?;

        self.scanner.set_position(end);
        Ok(Step::Token(
            Token::new(TokenKind::Text, (start, end)).with_content(content),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(input: &[u8]) -> Token<'_> {
        match Tokenizer::new(input, 0, true).next_token() {
            Ok(Step::Token(token)) => token,
            other => panic!("expected token, got {other:?}"),
        }
    }

    #[test]
    fn test_start_tag_with_attributes() {
        let t = token(b"<Artist id=\"7\" kind='x>y'>rest");
        assert_eq!(t.kind, TokenKind::StartTag);
        assert_eq!(t.name, Some(&b"Artist"[..]));
        assert_eq!(t.content, Some(&b" id=\"7\" kind='x>y'"[..]));
        assert_eq!(t.span, (0, 26));
    }

    #[test]
    fn test_empty_element() {
        let t = token(b"<br/>");
        assert_eq!(t.kind, TokenKind::EmptyTag);
        assert_eq!(t.name, Some(&b"br"[..]));
        assert_eq!(t.content, Some(&b""[..]));

        let t = token(b"<img src=\"a\" />");
        assert_eq!(t.kind, TokenKind::EmptyTag);
        assert_eq!(t.content, Some(&b" src=\"a\" "[..]));
    }

    #[test]
    fn test_end_tag() {
        let t = token(b"</Artist  >");
        assert_eq!(t.kind, TokenKind::EndTag);
        assert_eq!(t.name, Some(&b"Artist"[..]));
        assert_eq!(t.span, (0, 11));
    }

    #[test]
    fn test_text_stops_at_markup() {
        let t = token(b"Len Lye &amp; co<Name>");
        assert_eq!(t.kind, TokenKind::Text);
        assert_eq!(t.content, Some(&b"Len Lye &amp; co"[..]));
    }

    #[test]
    fn test_comment_cdata_pi() {
        let t = token(b"<!-- a > b -->");
        assert_eq!(t.kind, TokenKind::Comment);
        assert_eq!(t.content, Some(&b" a > b "[..]));

        let t = token(b"<![CDATA[x < y]]>");
        assert_eq!(t.kind, TokenKind::CData);
        assert_eq!(t.content, Some(&b"x < y"[..]));

        let t = token(b"<?render mode=\"fast\"?>");
        assert_eq!(t.kind, TokenKind::ProcessingInstruction);
        assert_eq!(t.name, Some(&b"render"[..]));
        assert_eq!(t.content, Some(&b"mode=\"fast\""[..]));
    }

    #[test]
    fn test_xml_declaration() {
        let t = token(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>");
        assert_eq!(t.kind, TokenKind::XmlDeclaration);
        assert_eq!(t.content, Some(&b"version=\"1.0\" encoding=\"UTF-8\""[..]));
    }

    #[test]
    fn test_doctype_with_subset() {
        let t = token(b"<!DOCTYPE note [<!ELEMENT note (#PCDATA)>]><note/>");
        assert_eq!(t.kind, TokenKind::DocType);
        assert_eq!(t.name, Some(&b"note"[..]));
        assert_eq!(t.span, (0, 43));
    }

    #[test]
    fn test_need_more_when_window_ends_inside_token() {
        for partial in [&b"<Art"[..], b"<a x=\"1>", b"<!-", b"<!-- open", b"<![CDA", b"</a", b"<?pi", b"text"] {
            let step = Tokenizer::new(partial, 0, false).next_token().unwrap();
            assert_eq!(step, Step::NeedMore, "{:?}", String::from_utf8_lossy(partial));
        }
        assert_eq!(Tokenizer::new(b"", 0, false).next_token().unwrap(), Step::NeedMore);
    }

    #[test]
    fn test_truncated_document_is_an_error() {
        let err = Tokenizer::new(b"<Artist", 100, true).next_token().unwrap_err();
        assert_eq!(err.position, 100);
        assert!(err.message.contains("start tag"));

        let err = Tokenizer::new(b"<!-- never closed", 0, true).next_token().unwrap_err();
        assert!(err.message.contains("comment"));
    }

    #[test]
    fn test_text_at_end_of_source() {
        let t = token(b"\n  ");
        assert_eq!(t.kind, TokenKind::Text);
        assert_eq!(t.span, (0, 3));
        assert_eq!(Tokenizer::new(b"", 0, true).next_token().unwrap(), Step::End);
    }

    #[test]
    fn test_syntax_errors() {
        let cases: [&[u8]; 7] = [
            b"<1abc>",
            b"</a b=\"c\">",
            b"<!ELEMENT x>",
            b"<!-- a -- b -->",
            b"<?XML version=\"1.0\"?>",
            b"a ]]> b<",
            b"fish & chips<",
        ];
        for input in cases {
            assert!(
                Tokenizer::new(input, 0, true).next_token().is_err(),
                "{:?}",
                String::from_utf8_lossy(input)
            );
        }
    }
}
