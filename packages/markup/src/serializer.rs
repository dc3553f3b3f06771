//! Markup serialization.
//!
//! Output mirrors the parser: values are written verbatim with their original
//! quote style, so `serialize(parse(x))` reproduces `x` for well-formed input
//! modulo whitespace inside tags.

use crate::dom::{Attribute, Document, NodeId, NodeKind, Quote};
use crate::parser::is_void_element;

/// Serialize the whole document
pub fn serialize(document: &Document) -> String {
    document.inner_html(document.root())
}

impl Document {
    pub fn to_html(&self) -> String {
        serialize(self)
    }

    /// Markup of the node itself, including its tag
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, id, &mut out);
        out
    }

    /// Markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            write_node(self, *child, &mut out);
        }
        out
    }
}

fn write_node(document: &Document, id: NodeId, out: &mut String) {
    match document.kind(id) {
        NodeKind::Fragment => {
            for child in document.children(id) {
                write_node(document, *child, out);
            }
        }
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Doctype(text) => {
            out.push_str("<!");
            out.push_str(text);
            out.push('>');
        }
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for attribute in &element.attributes {
                out.push(' ');
                write_attribute(attribute, out);
            }

            let children = document.children(id);
            if element.self_closing && children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            if is_void_element(&element.name) && children.is_empty() {
                return;
            }

            for child in children {
                write_node(document, *child, out);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

fn write_attribute(attribute: &Attribute, out: &mut String) {
    out.push_str(&attribute.name);
    let Some(value) = &attribute.value else {
        return;
    };
    out.push('=');
    match attribute.quote {
        Quote::Double => {
            out.push('"');
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
        Quote::Single => {
            out.push('\'');
            out.push_str(&value.replace('\'', "&#39;"));
            out.push('\'');
        }
        Quote::None if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"') => {
            out.push('"');
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
        Quote::None => out.push_str(value),
    }
}
