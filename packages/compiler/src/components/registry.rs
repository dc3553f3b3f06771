use super::suggest::closest_match;
use super::{ComponentDefinition, PropSpec};
use crate::error::{ViewError, ViewResult};
use heck::{ToKebabCase, ToPascalCase};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stencil_common::FileSystem;
use stencil_runtime::Data;
use tracing::debug;

/// A definition plus the props declared for it at registration
#[derive(Debug, Clone)]
pub struct RegisteredComponent {
    pub definition: ComponentDefinition,
    pub props: Vec<PropSpec>,
}

impl RegisteredComponent {
    pub fn new(definition: ComponentDefinition, mut props: Vec<PropSpec>) -> Self {
        if let ComponentDefinition::Factory(component) = &definition {
            let declared = component.props();
            props.retain(|prop| !declared.iter().any(|spec| spec.name == prop.name));
            props.splice(0..0, declared);
        }
        Self { definition, props }
    }

    pub fn defaults(&self) -> Data {
        self.props
            .iter()
            .map(|prop| (prop.name.clone(), prop.default.clone()))
            .collect()
    }

    pub fn hidden_props(&self) -> Vec<String> {
        self.props
            .iter()
            .filter(|prop| prop.hidden)
            .map(|prop| prop.name.clone())
            .collect()
    }
}

/// How a tag was resolved
#[derive(Debug, Clone)]
pub enum ResolvedComponent<'a> {
    Registered(&'a RegisteredComponent),
    /// Template file found in the autoload directory
    Autoloaded(PathBuf),
}

#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    components: BTreeMap<String, RegisteredComponent>,
    autoload_dir: Option<PathBuf>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tag: &str, definition: ComponentDefinition) -> ViewResult<()> {
        self.register_with_props(tag, definition, Vec::new())
    }

    pub fn register_with_props(
        &mut self,
        tag: &str,
        definition: ComponentDefinition,
        props: Vec<PropSpec>,
    ) -> ViewResult<()> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ViewError::InvalidArgument(
                "Component tag can't be empty".to_string(),
            ));
        }
        if self.components.contains_key(tag) {
            return Err(ViewError::ComponentAlreadyRegistered {
                tag: tag.to_string(),
            });
        }

        debug!(component = tag, definition = ?definition, "Registering component");
        self.components
            .insert(tag.to_string(), RegisteredComponent::new(definition, props));
        Ok(())
    }

    /// Exact lookup first, then ASCII case-insensitive
    pub fn get(&self, tag: &str) -> Option<&RegisteredComponent> {
        self.components.get(tag).or_else(|| {
            self.components
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(tag))
                .map(|(_, component)| component)
        })
    }

    pub fn has(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn set_autoload_dir(&mut self, dir: impl Into<PathBuf>) {
        self.autoload_dir = Some(dir.into());
    }

    pub fn autoload_dir(&self) -> Option<&Path> {
        self.autoload_dir.as_deref()
    }

    /// `user-card` is looked up as `UserCard.<ext>`, then `user-card.<ext>`
    pub fn autoload_path(&self, fs: &dyn FileSystem, tag: &str, extension: &str) -> Option<PathBuf> {
        let dir = self.autoload_dir.as_ref()?;
        [tag.to_pascal_case(), tag.to_kebab_case()]
            .into_iter()
            .map(|name| dir.join(format!("{}.{}", name, extension)))
            .find(|path| fs.exists(path))
    }

    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        tag: &str,
        extension: &str,
    ) -> ViewResult<ResolvedComponent<'_>> {
        if let Some(component) = self.get(tag) {
            return Ok(ResolvedComponent::Registered(component));
        }
        if let Some(path) = self.autoload_path(fs, tag, extension) {
            debug!(component = tag, path = %path.display(), "Autoloading component");
            return Ok(ResolvedComponent::Autoloaded(path));
        }
        Err(self.not_found(tag))
    }

    pub fn not_found(&self, tag: &str) -> ViewError {
        let mut suggestions = Vec::new();
        if let Some(candidate) = closest_match(tag, self.tags()) {
            suggestions.push(format!(
                "Did you register this component or do you mean `{}`?",
                candidate
            ));
        }
        if let Some(dir) = &self.autoload_dir {
            suggestions.push(format!(
                "Autoloaded components are looked up in `{}`.",
                dir.display()
            ));
        }
        ViewError::ComponentNotFound {
            tag: tag.to_string(),
            suggestions,
        }
    }
}
