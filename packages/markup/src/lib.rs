//! # Stencil Markup
//!
//! A small, lenient HTML layer for template compilation: a byte-cursor parser
//! that never rewrites author text, an arena tree with stable [`NodeId`]s for
//! index-based rewriting, and a matching serializer.
//!
//! ```rust,ignore
//! use stencil_markup::parse;
//!
//! let doc = parse("<app-card title=\"Hi\">Body</app-card>");
//! let cards = doc.find_elements(|el| el.name.starts_with("app-"));
//! ```

pub mod dom;
pub mod parser;
pub mod serializer;

pub use dom::{Attribute, Document, Element, Node, NodeId, NodeKind, Quote};
pub use parser::{is_void_element, parse, Parser, VOID_ELEMENTS};
pub use serializer::serialize;
