//! Restores URL-bearing attribute values in expanded component markup.

use std::collections::BTreeSet;
use stencil_markup::{Document, NodeId};

pub const URL_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "link",
    "action",
    "background",
    "cite",
    "data",
    "formaction",
    "icon",
    "longdesc",
    "manifest",
    "poster",
    "srcset",
];

pub fn is_url_attribute(name: &str) -> bool {
    URL_ATTRIBUTES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Decode URL attributes on every element in the subtrees under `roots`.
/// Detached roots are ignored and each element is visited once.
pub fn decode_url_attributes(document: &mut Document, roots: &[NodeId]) {
    let mut visited = BTreeSet::new();

    for root in roots {
        if !document.is_attached(*root) {
            continue;
        }
        let subtree: Vec<NodeId> = std::iter::once(*root)
            .chain(document.descendants(*root))
            .collect();

        for id in subtree {
            if !visited.insert(id) {
                continue;
            }
            let Some(element) = document.element_mut(id) else {
                continue;
            };
            for attribute in &mut element.attributes {
                if !is_url_attribute(&attribute.name) {
                    continue;
                }
                if let Some(value) = attribute.value.as_mut() {
                    *value = decode_url(value);
                }
            }
        }
    }
}

/// Percent-decoding followed by entity decoding
pub fn decode_url(value: &str) -> String {
    let value = percent_decode(value).unwrap_or_else(|| value.to_string());
    decode_entities(&value)
}

/// `None` when nothing was decoded or the result is not UTF-8.
/// `+` is left alone.
fn percent_decode(value: &str) -> Option<String> {
    if !value.contains('%') {
        return None;
    }

    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';').and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end))) {
            Some((decoded, end)) => {
                out.push(decoded);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let number = entity.strip_prefix('#')?;
            let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_url() {
        assert_eq!(decode_url("/search?q=a%20b&amp;page=2"), "/search?q=a b&page=2");
        assert_eq!(decode_url("it&#39;s&#x21;"), "it's!");
        assert_eq!(decode_url("a+b"), "a+b");
    }

    #[test]
    fn test_malformed_sequences_are_kept() {
        assert_eq!(decode_url("100%"), "100%");
        assert_eq!(decode_url("%zz"), "%zz");
        assert_eq!(decode_url("%ff"), "%ff");
        assert_eq!(decode_url("fish & chips"), "fish & chips");
        assert_eq!(decode_url("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_only_url_attributes_under_roots_are_decoded() {
        let mut document =
            stencil_markup::parse(r#"<a href="/x%20y" title="a%20b"></a><img src="/p%20q">"#);
        let roots = document.children(document.root()).to_vec();

        decode_url_attributes(&mut document, &roots[..1]);

        assert_eq!(
            document.to_html(),
            r#"<a href="/x y" title="a%20b"></a><img src="/p%20q">"#
        );
    }
}
