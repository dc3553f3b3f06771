use stencil_common::CommonError;
use stencil_runtime::EvalError;
use std::path::PathBuf;
use thiserror::Error;

pub type ViewResult<T> = Result<T, ViewError>;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("View `{view}` is not found")]
    ViewNotFound { view: String },

    #[error("Extended view `{}` is not found", .path.display())]
    ExtendedViewLayoutNotFound { path: PathBuf },

    #[error("Component `{tag}` is not found.{}", .suggestions.iter().map(|s| format!(" {}", s)).collect::<String>())]
    ComponentNotFound {
        tag: String,
        suggestions: Vec<String>,
    },

    #[error("`{name}` directive is already registered")]
    DirectiveAlreadyRegistered { name: String },

    #[error("`{tag}` component is already registered")]
    ComponentAlreadyRegistered { tag: String },

    #[error("Directive `{name}` is not registered")]
    UnknownDirective { name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No compiled artifact for key `{key}`")]
    ArtifactNotFound { key: String },

    #[error("Recursive component detected: {component}\nCall stack: {}", .call_stack.join(" → "))]
    RecursiveComponent {
        component: String,
        call_stack: Vec<String>,
    },

    #[error("Circular include: {}", .chain.join(" → "))]
    CircularInclude { chain: Vec<String> },

    #[error("{what} exceeded the maximum depth of {limit}")]
    RecursionLimit { what: String, limit: usize },

    #[error("Directive `{name}` failed: {message}")]
    Directive { name: String, message: String },

    #[error("Render error: {0}")]
    Render(#[from] EvalError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ViewError {
    pub fn view_not_found(view: impl Into<String>) -> Self {
        Self::ViewNotFound { view: view.into() }
    }

    pub fn recursion_limit(what: impl Into<String>, limit: usize) -> Self {
        Self::RecursionLimit {
            what: what.into(),
            limit,
        }
    }

    /// Hints attached to a `ComponentNotFound` error
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::ComponentNotFound { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Errors a fallback view may stand in for
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ViewNotFound { .. })
    }
}

impl From<CommonError> for ViewError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::NotFound { path } => Self::view_not_found(path.display().to_string()),
            CommonError::Io(err) => Self::Io(err),
        }
    }
}
