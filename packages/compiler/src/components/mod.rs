//! Custom tags backed by templates, with named slots.

pub mod expander;
pub mod registry;
pub mod suggest;
pub mod urls;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stencil_runtime::Data;

pub use expander::{ComponentExpander, ComponentRenderer, RenderedComponent};
pub use registry::{ComponentRegistry, RegisteredComponent, ResolvedComponent};
pub use suggest::{closest_match, MAX_SUGGESTION_DISTANCE};

/// Where a component's markup comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentSource {
    /// View name under the components directory
    View(String),
    Inline(String),
}

/// A component implemented in Rust
pub trait Component: Send + Sync {
    fn template(&self) -> ComponentSource;

    /// Declared props. Read once, when the component is registered.
    fn props(&self) -> Vec<PropSpec> {
        Vec::new()
    }

    /// Extra render data computed from the resolved props
    fn data(&self, _props: &Data) -> Data {
        Data::new()
    }
}

#[derive(Clone)]
pub enum ComponentDefinition {
    View(String),
    Inline(String),
    Factory(Arc<dyn Component>),
}

impl ComponentDefinition {
    pub fn factory(component: impl Component + 'static) -> Self {
        Self::Factory(Arc::new(component))
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(view) => f.debug_tuple("View").field(view).finish(),
            Self::Inline(markup) => f.debug_tuple("Inline").field(markup).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// A declared component prop
#[derive(Debug, Clone, PartialEq)]
pub struct PropSpec {
    pub name: String,
    pub default: Value,
    /// Hidden props reach the template but are not copied onto the rendered root
    pub hidden: bool,
}

impl PropSpec {
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            hidden: false,
        }
    }

    pub fn hidden(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            hidden: true,
            ..Self::new(name, default)
        }
    }
}
