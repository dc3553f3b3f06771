//! Directive compilation.
//!
//! Openers are matched to `@end<name>` closers with an explicit name stack, so
//! nested blocks of the same name pair up innermost-first. Block bodies are
//! compiled before their handler runs, and the whole text is re-scanned until
//! a pass changes nothing, in case a handler emits new markers.

use super::lexer::{scan_markers, Marker};
use super::{DirectiveKind, DirectiveRegistry};
use crate::error::{ViewError, ViewResult};
use std::ops::Range;
use tracing::{debug, instrument, trace};

pub struct DirectiveCompiler<'a> {
    registry: &'a DirectiveRegistry,
    max_depth: usize,
}

/// A replacement decided during one pass
enum Edit<'src> {
    Block {
        opener: Marker<'src>,
        closer: Marker<'src>,
    },
    Single(Marker<'src>),
}

impl Edit<'_> {
    fn range(&self) -> Range<usize> {
        match self {
            Edit::Block { opener, closer } => opener.span.start..closer.span.end,
            Edit::Single(marker) => marker.span.clone(),
        }
    }
}

impl<'a> DirectiveCompiler<'a> {
    pub fn new(registry: &'a DirectiveRegistry, max_depth: usize) -> Self {
        Self {
            registry,
            max_depth,
        }
    }

    /// Replace every registered directive marker until a fixed point
    #[instrument(skip(self, source), fields(len = source.len()))]
    pub fn compile(&self, source: &str) -> ViewResult<String> {
        let mut current = source.to_string();

        for pass in 1..=self.max_depth {
            let next = self.compile_pass(&current, 0)?;
            if next == current {
                debug!(passes = pass, "Directives compiled");
                return Ok(next);
            }
            current = next;
        }

        Err(ViewError::recursion_limit("Directive compilation", self.max_depth))
    }

    fn compile_pass(&self, source: &str, depth: usize) -> ViewResult<String> {
        if depth >= self.max_depth {
            return Err(ViewError::recursion_limit("Directive nesting", self.max_depth));
        }

        let markers = scan_markers(source);
        if markers.is_empty() {
            return Ok(source.to_string());
        }

        let edits = self.plan(markers);
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;

        for edit in edits {
            let range = edit.range();
            out.push_str(&source[cursor..range.start]);
            out.push_str(&self.apply(source, &edit, depth)?);
            cursor = range.end;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }

    /// Decide which markers are replaced this pass: outermost block pairs, then
    /// single-line and bare markers outside of any pair.
    fn plan<'src>(&self, markers: Vec<Marker<'src>>) -> Vec<Edit<'src>> {
        let mut stack: Vec<usize> = Vec::new();
        let mut pairs: Vec<(usize, usize)> = Vec::new();

        for (index, marker) in markers.iter().enumerate() {
            if let Some(target) = marker.closes() {
                if let Some(position) = stack.iter().rposition(|open| markers[*open].name == target) {
                    pairs.push((stack[position], index));
                    // Openers left above the match have no closer
                    stack.truncate(position);
                }
                continue;
            }
            let is_block = marker.expression.is_some()
                && marker.leading_boundary
                && self.registry.get_kind(marker.name, DirectiveKind::Block).is_some();
            if is_block {
                stack.push(index);
            }
        }

        // Pairs complete innermost-first; keep the outermost ones
        pairs.sort_by_key(|(open, _)| *open);
        let mut outer: Vec<(usize, usize)> = Vec::new();
        for (open, close) in pairs {
            if outer.last().map_or(true, |(_, last_close)| open > *last_close) {
                outer.push((open, close));
            }
        }

        let mut edits = Vec::new();
        let mut outer_iter = outer.into_iter().peekable();
        let mut markers = markers.into_iter().enumerate();

        while let Some((index, marker)) = markers.next() {
            if let Some(&(open, close)) = outer_iter.peek() {
                if index == open {
                    outer_iter.next();
                    let mut closer = None;
                    for (inner, inner_marker) in markers.by_ref() {
                        if inner == close {
                            closer = Some(inner_marker);
                            break;
                        }
                    }
                    if let Some(closer) = closer {
                        edits.push(Edit::Block {
                            opener: marker,
                            closer,
                        });
                    }
                    continue;
                }
            }

            if !marker.leading_boundary || !marker.trailing_boundary {
                continue;
            }
            let kind = if marker.expression.is_some() {
                DirectiveKind::SingleLine
            } else {
                DirectiveKind::Terminating
            };
            if self.registry.get_kind(marker.name, kind).is_some() {
                edits.push(Edit::Single(marker));
            }
        }

        edits
    }

    fn apply(&self, source: &str, edit: &Edit, depth: usize) -> ViewResult<String> {
        let (marker, body) = match edit {
            Edit::Block { opener, closer } => {
                let body = self.compile_pass(&source[opener.span.end..closer.span.start], depth + 1)?;
                (opener, Some(body))
            }
            Edit::Single(marker) => (marker, None),
        };

        let directive = self.registry.get(marker.name)?;
        trace!(directive = marker.name, kind = ?directive.kind, "Applying directive");
        directive
            .call(marker.expression, body.as_deref())
            .map_err(|err| ViewError::Directive {
                name: marker.name.to_string(),
                message: err.message,
            })
    }
}
