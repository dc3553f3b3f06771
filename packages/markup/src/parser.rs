//! Lenient, lossless HTML parser.
//!
//! The parser keeps the author's text exactly as written: character references
//! are not decoded, attribute order and quoting are preserved, and anything that
//! does not look like markup stays text. Template syntax (`{{ }}`, `@if(...)`)
//! therefore survives a parse/serialize round trip untouched.

use crate::dom::{Attribute, Document, Element, NodeId, NodeKind, Quote};
use tracing::trace;

/// Elements that never have children
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching end tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(name))
}

fn is_tag_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':' | b'.')
}

fn is_attribute_name_end(c: u8) -> bool {
    c.is_ascii_whitespace() || matches!(c, b'=' | b'>' | b'/' | b'"' | b'\'')
}

/// Parse markup into a [`Document`]
pub fn parse(source: &str) -> Document {
    Parser::new(source).parse()
}

/// Parser state: a byte cursor plus the stack of open elements
pub struct Parser<'src> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
    document: Document,
    open: Vec<NodeId>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            document: Document::new(),
            open: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Document {
        while !self.is_at_end() {
            if self.starts_with("<!--") {
                self.parse_comment();
            } else if self.starts_with("</") && self.peek_at(2).is_some_and(is_tag_name_char) {
                self.parse_end_tag();
            } else if self.starts_with("<!") {
                self.parse_doctype();
            } else if self.peek() == Some(b'<') && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
                self.parse_start_tag();
            } else {
                self.parse_text();
            }
        }

        trace!(nodes = self.document.len(), unclosed = self.open.len(), "Markup parsed");
        self.document
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.source[self.pos..].starts_with(prefix)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn current_parent(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.document.root())
    }

    fn attach(&mut self, kind: NodeKind) -> NodeId {
        let id = self.document.create(kind);
        let parent = self.current_parent();
        self.document.append_child(parent, id);
        id
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current_parent();
        if let Some(last) = self.document.children(parent).last().copied() {
            if let NodeKind::Text(existing) = self.document.kind_mut(last) {
                existing.push_str(text);
                return;
            }
        }
        self.attach(NodeKind::Text(text.to_string()));
    }

    fn parse_text(&mut self) {
        let start = self.pos;
        // Always consume at least one byte so a stray `<` makes progress
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == b'<' {
                break;
            }
            self.pos += 1;
        }
        let source = self.source;
        self.push_text(&source[start..self.pos]);
    }

    fn parse_comment(&mut self) {
        let source = self.source;
        let start = self.pos;
        let body_start = start + 4;
        match source[body_start..].find("-->") {
            Some(end) => {
                let body = &source[body_start..body_start + end];
                self.attach(NodeKind::Comment(body.to_string()));
                self.pos = body_start + end + 3;
            }
            None => {
                self.pos = self.bytes.len();
                self.push_text(&source[start..]);
            }
        }
    }

    fn parse_doctype(&mut self) {
        let source = self.source;
        let start = self.pos;
        match source[start..].find('>') {
            Some(end) => {
                let body = &source[start + 2..start + end];
                self.attach(NodeKind::Doctype(body.to_string()));
                self.pos = start + end + 1;
            }
            None => {
                self.pos = self.bytes.len();
                self.push_text(&source[start..]);
            }
        }
    }

    fn read_tag_name(&mut self) -> &'src str {
        let source = self.source;
        let start = self.pos;
        while self.peek().is_some_and(is_tag_name_char) {
            self.pos += 1;
        }
        &source[start..self.pos]
    }

    fn parse_end_tag(&mut self) {
        self.pos += 2;
        let name = self.read_tag_name();
        match self.source[self.pos..].find('>') {
            Some(end) => self.pos += end + 1,
            None => self.pos = self.bytes.len(),
        }

        // Stray end tags are dropped
        if let Some(index) = self
            .open
            .iter()
            .rposition(|id| self.document.is_element_named(*id, name))
        {
            self.open.truncate(index);
        }
    }

    fn parse_start_tag(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let name = self.read_tag_name();
        let mut element = Element::new(name);

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    // `a<b` inside an expression: not a tag after all
                    self.pos = start;
                    self.parse_text();
                    return;
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    element.self_closing = true;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                }
                Some(_) => match self.parse_attribute() {
                    Some(attribute) => element.attributes.push(attribute),
                    // Open quote without a closing one: the whole tag is text
                    None => {
                        self.pos = start;
                        self.parse_text();
                        return;
                    }
                },
            }
        }

        let self_closing = element.self_closing || is_void_element(name);
        let raw_text = !self_closing && is_raw_text_element(name);
        let id = self.attach(NodeKind::Element(element));

        if raw_text {
            self.parse_raw_text(id, name);
        } else if !self_closing {
            self.open.push(id);
        }
    }

    fn parse_attribute(&mut self) -> Option<Attribute> {
        let start = self.pos;
        // A quote in name position is kept as part of the name
        self.pos += 1;
        while self.peek().is_some_and(|c| !is_attribute_name_end(c)) {
            self.pos += 1;
        }
        let name = self.source[start..self.pos].to_string();

        let before_equals = self.pos;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            self.pos = before_equals;
            return Some(Attribute::boolean(name));
        }
        self.pos += 1;
        self.skip_whitespace();

        let (value, quote) = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let end = self.bytes[value_start..].iter().position(|c| *c == quote)?;
                self.pos = value_start + end + 1;
                let quote = if quote == b'"' { Quote::Double } else { Quote::Single };
                (self.source[value_start..value_start + end].to_string(), quote)
            }
            _ => {
                let value_start = self.pos;
                while self.peek().is_some_and(|c| !c.is_ascii_whitespace() && c != b'>')
                    && !self.starts_with("/>")
                {
                    self.pos += 1;
                }
                (self.source[value_start..self.pos].to_string(), Quote::None)
            }
        };

        Some(Attribute {
            name,
            value: Some(value),
            quote,
        })
    }

    fn parse_raw_text(&mut self, element: NodeId, name: &str) {
        let source = self.source;
        let rest = &source[self.pos..];
        let closing = format!("</{}", name.to_ascii_lowercase());
        let end = rest.to_ascii_lowercase().find(&closing);
        let (text, consumed) = match end {
            Some(end) => {
                let after = &rest[end..];
                let close_len = after.find('>').map(|i| i + 1).unwrap_or(after.len());
                (&rest[..end], end + close_len)
            }
            None => (rest, rest.len()),
        };

        if !text.is_empty() {
            let text_id = self.document.create_text(text);
            self.document.append_child(element, text_id);
        }
        self.pos += consumed;
    }
}
