#![forbid(unsafe_code)]

//! Markup parser.
//!
//! A hand-rolled byte-cursor scanner over a useful subset of HTML: elements,
//! attributes (double-quoted, single-quoted, unquoted, and bare boolean),
//! self-closing syntax, void elements, comments, and character entities
//! (`&amp;` `&lt;` `&gt;` `&quot;` `&apos;` and numeric forms). Unknown
//! entities are passed through literally.
//!
//! Whitespace-only text runs between elements are dropped; any other text is
//! preserved verbatim (after entity decoding). Comments are skipped.
//!
//! Errors carry the byte offset where scanning went wrong.

use memchr::memchr;

use crate::error::ParseError;
use crate::node::{Node, is_void_element};

/// Parse markup into its top-level nodes, in document order.
pub fn parse_markup(input: &str) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        input,
        pos: 0,
    };
    let nodes = parser.parse_nodes()?;
    if parser.pos < parser.bytes.len() {
        // parse_nodes only stops early on a closing tag it does not own.
        let at = parser.pos;
        parser.pos += 2; // past "</"
        let tag = parser.scan_name();
        return Err(ParseError::StrayClosingTag { tag, at });
    }
    Ok(nodes)
}

struct Parser<'a> {
    bytes: &'a [u8],
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_nodes(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            if self.pos >= self.bytes.len() {
                return Ok(nodes);
            }
            if self.starts_with(b"</") {
                return Ok(nodes);
            }
            if self.starts_with(b"<!--") {
                self.skip_comment()?;
                continue;
            }
            if self.bytes[self.pos] == b'<' {
                nodes.push(self.parse_element()?);
                continue;
            }
            if let Some(text) = self.parse_text() {
                nodes.push(text);
            }
        }
    }

    /// Scan a text run up to the next `<` (or end of input). Returns `None`
    /// for whitespace-only runs.
    fn parse_text(&mut self) -> Option<Node> {
        let rest = &self.input[self.pos..];
        let end = memchr(b'<', rest.as_bytes()).unwrap_or(rest.len());
        let raw = &rest[..end];
        self.pos += end;
        if raw.chars().all(char::is_whitespace) {
            return None;
        }
        Some(Node::text(decode_entities(raw)))
    }

    fn parse_element(&mut self) -> Result<Node, ParseError> {
        let start = self.pos;
        self.pos += 1; // '<'
        let tag = self.scan_name();
        if tag.is_empty() {
            return Err(ParseError::MalformedTag { at: start });
        }
        let element = Node::element(tag.clone());

        // Attributes until '>' or '/>'.
        loop {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() {
                return Err(ParseError::UnexpectedEof { at: self.pos });
            }
            if self.starts_with(b"/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.bytes[self.pos] == b'>' {
                self.pos += 1;
                break;
            }
            let (name, value) = self.parse_attribute(start)?;
            element.set_attr(name, value);
        }

        if is_void_element(&tag) {
            return Ok(element);
        }

        for child in self.parse_nodes()? {
            element.append_child(&child);
        }

        // Closing tag.
        if !self.starts_with(b"</") {
            return Err(ParseError::UnclosedElement { tag, at: start });
        }
        let close_at = self.pos;
        self.pos += 2;
        let found = self.scan_name();
        self.skip_whitespace();
        if self.pos >= self.bytes.len() || self.bytes[self.pos] != b'>' {
            return Err(ParseError::UnexpectedEof { at: self.pos });
        }
        self.pos += 1;
        if found != tag {
            return Err(ParseError::MismatchedClosingTag {
                expected: tag,
                found,
                at: close_at,
            });
        }
        Ok(element)
    }

    fn parse_attribute(&mut self, tag_start: usize) -> Result<(String, String), ParseError> {
        let name = self.scan_attr_name();
        if name.is_empty() {
            return Err(ParseError::MalformedTag { at: tag_start });
        }
        self.skip_whitespace();
        if self.pos >= self.bytes.len() || self.bytes[self.pos] != b'=' {
            // Bare boolean attribute, e.g. `checked`.
            return Ok((name, String::new()));
        }
        self.pos += 1; // '='
        self.skip_whitespace();
        if self.pos >= self.bytes.len() {
            return Err(ParseError::UnexpectedEof { at: self.pos });
        }
        let value = match self.bytes[self.pos] {
            quote @ (b'"' | b'\'') => {
                self.pos += 1;
                let rest = &self.input[self.pos..];
                let Some(end) = memchr(quote, rest.as_bytes()) else {
                    return Err(ParseError::UnexpectedEof {
                        at: self.bytes.len(),
                    });
                };
                let raw = &rest[..end];
                self.pos += end + 1;
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while self.pos < self.bytes.len()
                    && !self.bytes[self.pos].is_ascii_whitespace()
                    && self.bytes[self.pos] != b'>'
                    && !self.starts_with(b"/>")
                {
                    self.pos += 1;
                }
                decode_entities(&self.input[start..self.pos])
            }
        };
        Ok((name, value))
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let at = self.pos;
        self.pos += 4; // "<!--"
        while self.pos < self.bytes.len() {
            if self.starts_with(b"-->") {
                self.pos += 3;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(ParseError::UnexpectedEof { at })
    }

    /// Tag and closing-tag names: ASCII alphanumeric plus `-` (custom tags).
    fn scan_name(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() || b == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Attribute names additionally allow `_`, `:`, and `.`.
    fn scan_attr_name(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(prefix)
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                // Unknown entity: pass the ampersand through and rescan
                // from the next character.
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
