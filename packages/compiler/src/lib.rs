//! # Stencil Compiler
//!
//! Turns view templates into artifacts the runtime executes:
//!
//! ```text
//! <!-- extend layouts/main -->
//! <!-- block content -->
//!   <app-card title="Team">
//!     <span slot="header">Members</span>
//!     @foreach(users as user)
//!       <p>{{ user.name }}</p>
//!     @endforeach
//!   </app-card>
//! <!-- endblock -->
//! ```
//!
//! Inheritance markers are resolved first, then custom `app-*` tags are
//! replaced by their rendered templates, then `{{ }}`/`{!! !!}` and `@`
//! directives are lowered to runtime statements. Artifacts are cached under
//! `<cachePath>/views`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stencil_compiler::{Engine, EngineConfig};
//! use stencil_runtime::Data;
//!
//! let engine = Engine::new(EngineConfig::load(".")?)?;
//! let html = engine.make("home", &Data::new())?;
//! ```

pub mod cache;
pub mod components;
pub mod config;
pub mod directives;
pub mod engine;
pub mod error;
pub mod inheritance;
pub mod interpolation;

#[cfg(test)]
mod tests_components;

#[cfg(test)]
mod tests_engine;

pub use cache::{derive_key, ArtifactKey, CacheStore};
pub use components::{
    Component, ComponentDefinition, ComponentExpander, ComponentRegistry, ComponentRenderer,
    ComponentSource, PropSpec, RenderedComponent,
};
pub use config::{EngineConfig, DEFAULT_CONFIG_NAME};
pub use directives::{DirectiveCompiler, DirectiveError, DirectiveKind, DirectiveRegistry};
pub use engine::{Engine, TemplateSource};
pub use error::{ViewError, ViewResult};
pub use inheritance::InheritanceResolver;
pub use interpolation::Interpolator;
pub use stencil_runtime::Data;
