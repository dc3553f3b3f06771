use logos::Logos;
use std::ops::Range;

/// Coarse tokens of template text as seen by the directive compiler
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupToken<'src> {
    /// `@name`, without the `@`
    #[regex(r"@[A-Za-z_][A-Za-z0-9_-]*", |lex| &lex.slice()[1..])]
    Marker(&'src str),

    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,

    #[regex(r"[^@ \t\r\n\x0C]+")]
    Text,

    #[token("@")]
    At,
}

/// A directive marker found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'src> {
    pub name: &'src str,
    /// Byte range of the whole marker, parenthesized expression included
    pub span: Range<usize>,
    /// Trimmed text between the parentheses
    pub expression: Option<&'src str>,
    /// Preceded by start of text or whitespace
    pub leading_boundary: bool,
    /// Followed by end of text or whitespace
    pub trailing_boundary: bool,
}

impl<'src> Marker<'src> {
    /// `@endfoo` closes `@foo(...)`
    pub fn closes(&self) -> Option<&'src str> {
        if self.expression.is_some() {
            return None;
        }
        self.name.strip_prefix("end").filter(|name| !name.is_empty())
    }
}

/// Find every marker in `source`, in order. Markers inside another marker's
/// parentheses are skipped.
pub fn scan_markers(source: &str) -> Vec<Marker<'_>> {
    let bytes = source.as_bytes();
    let mut markers = Vec::new();
    let mut skip_until = 0;

    for (token, span) in MarkupToken::lexer(source).spanned() {
        let Ok(MarkupToken::Marker(name)) = token else {
            continue;
        };
        if span.start < skip_until {
            continue;
        }

        let (end, expression) = match bytes.get(span.end) {
            Some(b'(') => match find_closing_paren(source, span.end) {
                Some(close) => (close + 1, Some(source[span.end + 1..close].trim())),
                None => (span.end, None),
            },
            _ => (span.end, None),
        };
        skip_until = end;

        let leading_boundary = span.start == 0 || bytes[span.start - 1].is_ascii_whitespace();
        let trailing_boundary = bytes.get(end).map_or(true, |c| c.is_ascii_whitespace());

        markers.push(Marker {
            name,
            span: span.start..end,
            expression,
            leading_boundary,
            trailing_boundary,
        });
    }

    markers
}

/// Index of the `)` balancing the `(` at `open`. Parentheses inside string
/// literals do not count.
fn find_closing_paren(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;

    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(_) if c == b'\\' => i += 1,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}
