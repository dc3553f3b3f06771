//! Artifact parsing: text interleaved with `<% ... %>` statement tags.

use crate::ast::{Node, Program, SwitchCase};
use crate::error::{EvalError, EvalResult};
use crate::parser::{parse_assignment, parse_expression, parse_foreach_header, parse_range_header};
use tracing::trace;

pub const TAG_OPEN: &str = "<%";
pub const TAG_CLOSE: &str = "%>";

/// One lexical piece of an artifact
#[derive(Debug, Clone, PartialEq)]
enum Segment<'src> {
    Text(&'src str),
    Echo {
        source: &'src str,
        pos: usize,
        escape: bool,
    },
    Statement {
        keyword: &'src str,
        rest: &'src str,
        pos: usize,
        rest_pos: usize,
    },
}

impl Program {
    pub fn parse(source: &str) -> EvalResult<Program> {
        let segments = split(source)?;
        let mut builder = Builder {
            segments,
            pos: 0,
        };
        let (nodes, _) = builder.parse_block(&[])?;
        trace!(nodes = nodes.len(), "Artifact parsed");
        Ok(Program { nodes })
    }
}

fn split(source: &str) -> EvalResult<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = source[cursor..].find(TAG_OPEN) {
        let open = cursor + offset;
        if open > cursor {
            segments.push(Segment::Text(&source[cursor..open]));
        }

        let body_start = open + TAG_OPEN.len();
        let close = if source[body_start..].starts_with('#') {
            source[body_start..].find(TAG_CLOSE).map(|end| body_start + end)
        } else {
            find_tag_close(source, body_start)
        }
        .ok_or(EvalError::UnterminatedTag { pos: open })?;
        let body = &source[body_start..close];
        cursor = close + TAG_CLOSE.len();

        if let Some(expr) = body.strip_prefix('=') {
            segments.push(Segment::Echo {
                source: expr,
                pos: body_start + 1,
                escape: true,
            });
        } else if let Some(expr) = body.strip_prefix('-') {
            segments.push(Segment::Echo {
                source: expr,
                pos: body_start + 1,
                escape: false,
            });
        } else if body.starts_with('#') {
            continue;
        } else {
            let trimmed = body.trim_start();
            let pos = body_start + (body.len() - trimmed.len());
            let trimmed = trimmed.trim_end();
            let (keyword, rest) = match trimmed.find(char::is_whitespace) {
                Some(split) => (&trimmed[..split], trimmed[split..].trim_start()),
                None => (trimmed, ""),
            };
            let rest_pos = pos + (trimmed.len() - rest.len());
            segments.push(Segment::Statement {
                keyword,
                rest,
                pos,
                rest_pos,
            });
        }
    }

    if cursor < source.len() {
        segments.push(Segment::Text(&source[cursor..]));
    }
    Ok(segments)
}

/// Find the `%>` closing a tag body, skipping quoted strings
fn find_tag_close(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(_) if c == b'\\' => {
                i += 2;
                continue;
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == b'"' || c == b'\'' => quote = Some(c),
            None if source[i..].starts_with(TAG_CLOSE) => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

struct Builder<'src> {
    segments: Vec<Segment<'src>>,
    pos: usize,
}

impl<'src> Builder<'src> {
    /// Collect nodes until one of `terminators` (returned, consumed) or the end of input
    fn parse_block(
        &mut self,
        terminators: &[&str],
    ) -> EvalResult<(Vec<Node>, Option<Segment<'src>>)> {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.get(self.pos).cloned() {
            self.pos += 1;
            match segment {
                Segment::Text(text) => nodes.push(Node::Text(text.to_string())),
                Segment::Echo {
                    source,
                    pos,
                    escape,
                } => nodes.push(Node::Echo {
                    expr: parse_expression(source, pos)?,
                    escape,
                }),
                Segment::Statement { keyword, .. } if terminators.contains(&keyword) => {
                    return Ok((nodes, Some(segment)));
                }
                Segment::Statement {
                    keyword,
                    rest,
                    pos,
                    rest_pos,
                } => {
                    nodes.push(self.parse_statement(keyword, rest, pos, rest_pos)?);
                }
            }
        }

        Ok((nodes, None))
    }

    fn parse_statement(
        &mut self,
        keyword: &str,
        rest: &str,
        pos: usize,
        rest_pos: usize,
    ) -> EvalResult<Node> {
        match keyword {
            "if" => self.parse_if(rest, rest_pos, pos),
            "foreach" => {
                let header = parse_foreach_header(rest, rest_pos)?;
                let body = self.parse_body(&["endforeach"], keyword, pos)?;
                Ok(Node::Foreach {
                    iterable: header.iterable,
                    key: header.key,
                    item: header.item,
                    body,
                })
            }
            "for" => {
                let header = parse_range_header(rest, rest_pos)?;
                let body = self.parse_body(&["endfor"], keyword, pos)?;
                Ok(Node::For {
                    variable: header.variable,
                    start: header.start,
                    end: header.end,
                    inclusive: header.inclusive,
                    body,
                })
            }
            "while" => {
                let condition = parse_expression(rest, rest_pos)?;
                let body = self.parse_body(&["endwhile"], keyword, pos)?;
                Ok(Node::While { condition, body })
            }
            "do" => {
                let (body, terminator) = self.parse_block(&["dowhile"])?;
                let Some(Segment::Statement { rest, rest_pos, .. }) = terminator else {
                    return Err(unclosed(keyword, pos));
                };
                let condition = parse_expression(rest, rest_pos)?;
                Ok(Node::DoWhile { body, condition })
            }
            "switch" => self.parse_switch(rest, rest_pos, pos),
            "set" => {
                let (name, value) = parse_assignment(rest, rest_pos)?;
                Ok(Node::Set { name, value })
            }
            "break" => Ok(Node::Break),
            _ => Err(EvalError::syntax(
                pos,
                format!("Unexpected `{}` tag", keyword),
            )),
        }
    }

    fn parse_body(&mut self, terminators: &[&str], keyword: &str, pos: usize) -> EvalResult<Vec<Node>> {
        match self.parse_block(terminators)? {
            (body, Some(_)) => Ok(body),
            (_, None) => Err(unclosed(keyword, pos)),
        }
    }

    fn parse_if(&mut self, rest: &str, rest_pos: usize, pos: usize) -> EvalResult<Node> {
        let mut branches = Vec::new();
        let mut condition = parse_expression(rest, rest_pos)?;

        loop {
            let (body, terminator) = self.parse_block(&["elseif", "else", "endif"])?;
            branches.push((condition, body));
            match terminator {
                Some(Segment::Statement {
                    keyword: "elseif",
                    rest,
                    rest_pos,
                    ..
                }) => {
                    condition = parse_expression(rest, rest_pos)?;
                }
                Some(Segment::Statement {
                    keyword: "else", ..
                }) => {
                    let otherwise = self.parse_body(&["endif"], "if", pos)?;
                    return Ok(Node::If {
                        branches,
                        otherwise,
                    });
                }
                Some(_) => {
                    return Ok(Node::If {
                        branches,
                        otherwise: Vec::new(),
                    })
                }
                None => return Err(unclosed("if", pos)),
            }
        }
    }

    fn parse_switch(&mut self, rest: &str, rest_pos: usize, pos: usize) -> EvalResult<Node> {
        let subject = parse_expression(rest, rest_pos)?;
        let terminators = ["case", "default", "endswitch"];

        // Anything before the first case (usually whitespace) never renders
        let (_, mut terminator) = self.parse_block(&terminators)?;
        let mut cases = Vec::new();

        loop {
            let test = match terminator {
                Some(Segment::Statement {
                    keyword: "case",
                    rest,
                    rest_pos,
                    ..
                }) => Some(parse_expression(rest, rest_pos)?),
                Some(Segment::Statement {
                    keyword: "default", ..
                }) => None,
                Some(_) => return Ok(Node::Switch { subject, cases }),
                None => return Err(unclosed("switch", pos)),
            };
            let (body, next) = self.parse_block(&terminators)?;
            cases.push(SwitchCase { test, body });
            terminator = next;
        }
    }
}

fn unclosed(keyword: &str, pos: usize) -> EvalError {
    EvalError::UnclosedBlock {
        keyword: keyword.to_string(),
        pos,
    }
}
