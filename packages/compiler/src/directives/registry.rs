use super::{Directive, DirectiveError, DirectiveKind};
use crate::error::{ViewError, ViewResult};
use std::collections::HashMap;
use tracing::debug;

/// Name to directive table. Populated at startup, read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct DirectiveRegistry {
    directives: HashMap<String, Directive>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, kind: DirectiveKind, handler: F) -> ViewResult<()>
    where
        F: Fn(Option<&str>, Option<&str>) -> Result<String, DirectiveError> + Send + Sync + 'static,
    {
        if name.trim().is_empty() {
            return Err(ViewError::InvalidArgument(
                "Directive name can't be empty".to_string(),
            ));
        }
        if self.directives.contains_key(name) {
            return Err(ViewError::DirectiveAlreadyRegistered {
                name: name.to_string(),
            });
        }

        debug!(directive = name, kind = ?kind, "Registering directive");
        self.directives
            .insert(name.to_string(), Directive::new(name, kind, handler));
        Ok(())
    }

    pub fn get(&self, name: &str) -> ViewResult<&Directive> {
        self.directives
            .get(name)
            .ok_or_else(|| ViewError::UnknownDirective {
                name: name.to_string(),
            })
    }

    pub fn has(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// The directive registered under `name`, if its kind is `kind`
    pub fn get_kind(&self, name: &str, kind: DirectiveKind) -> Option<&Directive> {
        if !self.has(name) {
            return None;
        }
        self.get(name).ok().filter(|directive| directive.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}
