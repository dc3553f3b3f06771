//! # Stencil Runtime
//!
//! Executes compiled artifacts. An artifact is plain text interleaved with
//! statement tags:
//!
//! ```text
//! <% foreach users as user %>
//!   <li class="<%= user.role ?? 'guest' %>"><%- user.bio %></li>
//! <% endforeach %>
//! ```
//!
//! `<%= %>` escapes its value for HTML, `<%- %>` writes it verbatim and `<%# %>`
//! is a comment. Control tags cover `if`/`elseif`/`else`, `foreach`, ranged `for`,
//! `while`, `do`/`dowhile`, `switch`/`case`/`default`/`break` and `set`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stencil_runtime::{Data, Renderer};
//!
//! let mut data = Data::new();
//! data.insert("name".into(), "<b>World</b>".into());
//! let html = Renderer::new().render("Hello <%= name %>", &data)?;
//! assert_eq!(html, "Hello &lt;b&gt;World&lt;/b&gt;");
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod value;

#[cfg(test)]
mod tests_control_flow;

#[cfg(test)]
mod tests_expressions;

pub use ast::{BinaryOp, Expr, Node, Program, SwitchCase, UnaryOp};
pub use error::{EvalError, EvalResult};
pub use evaluator::{Renderer, DEFAULT_MAX_LOOP_ITERATIONS};
pub use parser::parse_expression;
pub use program::{TAG_CLOSE, TAG_OPEN};
pub use value::{escape_html, is_truthy, to_display, Data};
