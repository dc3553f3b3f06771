//! Control directives: `@name(expr) ... @endname`, `@name(expr)` and bare `@name`.

pub mod builtin;
pub mod compiler;
pub mod lexer;
pub mod registry;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use builtin::register_builtins;
pub use compiler::DirectiveCompiler;
pub use registry::DirectiveRegistry;

/// Marker shape a directive is dispatched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `@name(expr) body @endname`
    Block,
    /// `@name(expr)`
    SingleLine,
    /// `@name`
    Terminating,
}

/// Failure reported by a directive handler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DirectiveError {
    pub message: String,
}

impl DirectiveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Produces output text from an optional expression and an optional body
pub type DirectiveHandler =
    Arc<dyn Fn(Option<&str>, Option<&str>) -> Result<String, DirectiveError> + Send + Sync>;

#[derive(Clone)]
pub struct Directive {
    pub name: String,
    pub kind: DirectiveKind,
    handler: DirectiveHandler,
}

impl Directive {
    pub fn new<F>(name: impl Into<String>, kind: DirectiveKind, handler: F) -> Self
    where
        F: Fn(Option<&str>, Option<&str>) -> Result<String, DirectiveError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            handler: Arc::new(handler),
        }
    }

    pub fn call(&self, expression: Option<&str>, body: Option<&str>) -> Result<String, DirectiveError> {
        (self.handler)(expression, body)
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
