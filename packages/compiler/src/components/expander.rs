//! Replaces custom tags with their rendered templates.
//!
//! The text is parsed into an arena [`Document`]. Each pass takes a snapshot of
//! the custom tags still attached, renders them in document order and splices
//! the result in by id. Slot content from the calling tag is grouped by slot
//! name and moved into the rendered fragment before the splice.

use super::urls::decode_url_attributes;
use crate::error::{ViewError, ViewResult};
use regex::Regex;
use stencil_markup::{Attribute, Document, NodeId};
use tracing::{debug, instrument, trace};

/// Output of rendering one component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedComponent {
    pub html: String,
    /// Attribute names not copied onto the rendered root
    pub hidden: Vec<String>,
}

/// Renders a component by its local tag name (prefix stripped)
pub trait ComponentRenderer {
    fn render_component(
        &mut self,
        tag: &str,
        attributes: &[(String, String)],
    ) -> ViewResult<RenderedComponent>;
}

pub struct ComponentExpander {
    prefix: String,
    commented: Regex,
    live: Regex,
    max_depth: usize,
}

impl ComponentExpander {
    pub fn new(prefix: &str, max_depth: usize) -> ViewResult<Self> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return Err(ViewError::InvalidArgument(
                "Component prefix can't be empty".to_string(),
            ));
        }
        let escaped = regex::escape(&prefix);

        Ok(Self {
            commented: Regex::new(&format!(r"(?is)<!--\s*<{}-(.*?)\s*-->", escaped))?,
            live: Regex::new(&format!(r"(?i)<{}-", escaped))?,
            prefix,
            max_depth,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Expand every custom tag in `source`. Text without live custom tags is
    /// returned as is.
    #[instrument(skip(self, source, renderer), fields(prefix = %self.prefix))]
    pub fn expand(
        &self,
        source: &str,
        renderer: &mut dyn ComponentRenderer,
    ) -> ViewResult<String> {
        let normalized = self
            .commented
            .replace_all(source, "<!-- commented component -->");
        if !self.live.is_match(&normalized) {
            return Ok(normalized.into_owned());
        }

        let mut document = stencil_markup::parse(&normalized);
        let tag_prefix = format!("{}-", self.prefix);
        let mut produced = Vec::new();
        let mut passes = 0;

        loop {
            let tags = document.find_elements(|element| {
                element.name.to_ascii_lowercase().starts_with(&tag_prefix)
            });
            if tags.is_empty() {
                break;
            }

            passes += 1;
            if passes > self.max_depth {
                return Err(ViewError::recursion_limit(
                    "Component expansion",
                    self.max_depth,
                ));
            }
            trace!(pass = passes, tags = tags.len(), "Expanding custom tags");

            for tag in tags {
                if document.is_attached(tag) {
                    produced.extend(self.expand_tag(&mut document, tag, renderer)?);
                }
            }
        }

        decode_url_attributes(&mut document, &produced);
        Ok(document.to_html())
    }

    fn expand_tag(
        &self,
        document: &mut Document,
        tag: NodeId,
        renderer: &mut dyn ComponentRenderer,
    ) -> ViewResult<Vec<NodeId>> {
        let Some(element) = document.element(tag) else {
            return Ok(Vec::new());
        };
        let name = element.name.to_ascii_lowercase();
        let local = name
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(&name)
            .to_string();
        let attributes = element.attributes.clone();
        let props: Vec<(String, String)> = attributes
            .iter()
            .map(|attribute| (attribute.name.clone(), attribute.value().to_string()))
            .collect();

        debug!(component = %local, "Expanding component");
        let rendered = renderer.render_component(&local, &props)?;
        let mut fragment = stencil_markup::parse(&rendered.html);

        let target = attribute_target(&mut fragment);
        if let Some(target) = target {
            copy_attributes(&mut fragment, target, attributes, &rendered.hidden);
        }
        bind_children(document, tag, &mut fragment, target);

        let roots = fragment.children(fragment.root()).to_vec();
        let imported: Vec<NodeId> = roots
            .into_iter()
            .map(|root| document.import_subtree(&fragment, root))
            .collect();
        document.replace_with(tag, &imported);
        Ok(imported)
    }
}

/// The element the calling tag's attributes land on. A lone `template` root
/// is unwrapped first.
fn attribute_target(fragment: &mut Document) -> Option<NodeId> {
    let top = fragment.meaningful_children(fragment.root());
    let [only] = top.as_slice() else {
        return None;
    };
    let only = *only;

    if fragment.is_element_named(only, "template") {
        let inner = fragment.meaningful_children(only);
        let children = fragment.children(only).to_vec();
        fragment.replace_with(only, &children);
        return match inner.as_slice() {
            [single] if fragment.element(*single).is_some() => Some(*single),
            _ => None,
        };
    }

    fragment.element(only).map(|_| only)
}

fn copy_attributes(
    fragment: &mut Document,
    target: NodeId,
    attributes: Vec<Attribute>,
    hidden: &[String],
) {
    for attribute in attributes {
        if hidden.iter().any(|name| name.eq_ignore_ascii_case(&attribute.name)) {
            continue;
        }
        fragment.set_attribute(target, attribute);
    }
}

/// Move the calling tag's children into the fragment, into matching slots when
/// the fragment has any. Slots left empty become comments.
fn bind_children(
    document: &Document,
    tag: NodeId,
    fragment: &mut Document,
    target: Option<NodeId>,
) {
    let groups = group_children(document, tag, fragment);
    let slots = fragment.find_elements(|element| element.is("slot"));

    if slots.is_empty() {
        let parent = target
            .or_else(|| {
                fragment
                    .children(fragment.root())
                    .iter()
                    .copied()
                    .find(|id| fragment.element(*id).is_some())
            })
            .unwrap_or_else(|| fragment.root());
        for id in groups.into_iter().flat_map(|(_, ids)| ids) {
            fragment.append_child(parent, id);
        }
        return;
    }

    let mut filled = vec![false; slots.len()];
    for (name, ids) in groups {
        let position = slots.iter().enumerate().position(|(index, slot)| {
            !filled[index] && fragment.attribute(*slot, "name").unwrap_or("") == name
        });
        match position {
            Some(index) => {
                fragment.replace_with(slots[index], &ids);
                filled[index] = true;
            }
            None => debug!(slot = %name, "No slot for content, dropping it"),
        }
    }

    for (slot, filled) in slots.into_iter().zip(filled) {
        if filled || !fragment.is_attached(slot) {
            continue;
        }
        let markup = comment_text(&fragment.outer_html(slot));
        let comment = fragment.create_comment(markup);
        fragment.replace_with(slot, &[comment]);
    }
}

/// `--` may not appear inside a comment, so nested comments cannot end it early
fn comment_text(markup: &str) -> String {
    markup.replace("--", "-&#45;")
}

/// Imported children of `tag` grouped by slot name, in first-seen order
fn group_children(
    document: &Document,
    tag: NodeId,
    fragment: &mut Document,
) -> Vec<(String, Vec<NodeId>)> {
    let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
    let mut push = |name: String, id: NodeId| match groups.iter_mut().find(|(group, _)| *group == name) {
        Some((_, ids)) => ids.push(id),
        None => groups.push((name, vec![id])),
    };

    for child in document.meaningful_children(tag) {
        if document.is_element_named(child, "template") {
            let name = document.attribute(child, "slot").unwrap_or("").to_string();
            for grandchild in document.meaningful_children(child) {
                push(name.clone(), fragment.import_subtree(document, grandchild));
            }
        } else if document.element(child).is_some() {
            let name = document.attribute(child, "slot").unwrap_or("").to_string();
            let id = fragment.import_subtree(document, child);
            fragment.remove_attribute(id, "slot");
            push(name, id);
        } else {
            push(String::new(), fragment.import_subtree(document, child));
        }
    }

    groups
}
