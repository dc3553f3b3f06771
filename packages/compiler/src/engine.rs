//! The compile/render facade.
//!
//! An [`Engine`] owns every registry and the artifact cache. Compiling a source
//! runs inheritance, component expansion, interpolation and directives, in that
//! order, and stores the result. Rendering loads an artifact and executes it.

use crate::cache::{derive_key, ArtifactKey, CacheStore};
use crate::components::{
    Component, ComponentDefinition, ComponentExpander, ComponentRegistry, ComponentRenderer,
    ComponentSource, PropSpec, RenderedComponent, ResolvedComponent,
};
use crate::config::EngineConfig;
use crate::directives::{register_builtins, DirectiveCompiler, DirectiveError, DirectiveKind, DirectiveRegistry};
use crate::error::{ViewError, ViewResult};
use crate::inheritance::InheritanceResolver;
use crate::interpolation::Interpolator;
use heck::ToSnakeCase;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stencil_common::{CommonError, FileSystem, RealFileSystem};
use stencil_runtime::{Data, Renderer};
use tracing::{debug, info, instrument, warn};

/// What to compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// View name relative to the views directory
    View(String),
    /// Template file at an explicit path
    File(PathBuf),
    /// Markup held in memory. Unnamed sources are identified by a checksum.
    Inline {
        name: Option<String>,
        markup: String,
    },
}

impl TemplateSource {
    pub fn view(name: impl Into<String>) -> Self {
        Self::View(name.into())
    }

    pub fn inline(markup: impl Into<String>) -> Self {
        Self::Inline {
            name: None,
            markup: markup.into(),
        }
    }

    pub fn named(name: impl Into<String>, markup: impl Into<String>) -> Self {
        Self::Inline {
            name: Some(name.into()),
            markup: markup.into(),
        }
    }

    /// Identity the artifact key is derived from
    pub fn identity(&self, config: &EngineConfig) -> String {
        match self {
            Self::View(name) => config.view_path(name).display().to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Inline {
                name: Some(name), ..
            } => name.clone(),
            Self::Inline { name: None, markup } => {
                format!("inline-{:08x}", crc32fast::hash(markup.as_bytes()))
            }
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    fs: Arc<dyn FileSystem>,
    directives: DirectiveRegistry,
    components: ComponentRegistry,
    inheritance: InheritanceResolver,
    interpolator: Interpolator,
    expander: ComponentExpander,
    cache: CacheStore,
    renderer: Renderer,
    fallback_view: Option<PathBuf>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> ViewResult<Self> {
        Self::with_file_system(config, Arc::new(RealFileSystem))
    }

    /// Views, includes and component templates are read through `fs`.
    /// Artifacts always go to the real cache directory.
    pub fn with_file_system(config: EngineConfig, fs: Arc<dyn FileSystem>) -> ViewResult<Self> {
        config.validate()?;

        let mut directives = DirectiveRegistry::new();
        register_builtins(&mut directives)?;

        let mut components = ComponentRegistry::new();
        if let Some(dir) = &config.autoload_components {
            components.set_autoload_dir(dir.clone());
        }

        let mut engine = Self {
            inheritance: InheritanceResolver::new()?,
            interpolator: Interpolator::new()?,
            expander: ComponentExpander::new(&config.component_prefix, config.max_depth)?,
            cache: CacheStore::from_config(&config),
            renderer: Renderer::new().with_max_loop_iterations(config.max_loop_iterations),
            fallback_view: None,
            directives,
            components,
            fs,
            config,
        };
        if let Some(view) = engine.config.fallback_view.clone() {
            engine.set_fallback_view(&view)?;
        }

        debug!(
            views = %engine.config.views_path.display(),
            cache = %engine.cache.dir().display(),
            directives = engine.directives.len(),
            "Engine ready"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn register_directive<F>(&mut self, name: &str, kind: DirectiveKind, handler: F) -> ViewResult<()>
    where
        F: Fn(Option<&str>, Option<&str>) -> Result<String, DirectiveError> + Send + Sync + 'static,
    {
        self.directives.register(name, kind, handler)
    }

    pub fn register_component(&mut self, tag: &str, definition: ComponentDefinition) -> ViewResult<()> {
        self.components.register(tag, definition)
    }

    pub fn register_component_with_props(
        &mut self,
        tag: &str,
        definition: ComponentDefinition,
        props: Vec<PropSpec>,
    ) -> ViewResult<()> {
        self.components.register_with_props(tag, definition, props)
    }

    /// Rendered in place of a missing view when `throwNotFound` is off
    pub fn set_fallback_view(&mut self, view: &str) -> ViewResult<()> {
        let path = self.config.view_path(view);
        if !self.fs.exists(&path) {
            return Err(ViewError::view_not_found(view));
        }
        self.fallback_view = Some(path);
        Ok(())
    }

    pub fn fallback_view(&self) -> Option<&Path> {
        self.fallback_view.as_deref()
    }

    pub fn set_component_prefix(&mut self, prefix: &str) -> ViewResult<()> {
        self.expander = ComponentExpander::new(prefix, self.config.max_depth)?;
        self.config.component_prefix = self.expander.prefix().to_string();
        Ok(())
    }

    pub fn autoload_components_from(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        self.config.autoload_components = Some(dir.clone());
        self.components.set_autoload_dir(dir);
    }

    pub fn clear_cache(&self) -> bool {
        self.cache.clear()
    }

    /// Compile a source into an artifact. With `useCached` on, an existing
    /// artifact is reused without reading the source.
    #[instrument(skip(self))]
    pub fn compile(&self, source: &TemplateSource) -> ViewResult<ArtifactKey> {
        let identity = source.identity(&self.config);
        let key = derive_key(&identity);

        if self.cache.get(&key).is_some() {
            return Ok(key);
        }

        let text = self.load_source(source)?;
        let compiled = Session::new(self).compile_text(&text, &identity)?;
        self.cache.put(&key, &compiled)?;

        info!(identity = %identity, key = %key, "Compiled template");
        Ok(key)
    }

    /// Execute a compiled artifact
    pub fn render(&self, key: &ArtifactKey, data: &Data) -> ViewResult<String> {
        let artifact = self.cache.load(key)?;
        Ok(self.renderer.render(&artifact, data)?)
    }

    /// Compile and render a view, falling back to the fallback view when it
    /// is missing and `throwNotFound` is off
    pub fn make(&self, view: &str, data: &Data) -> ViewResult<String> {
        let err = match self.compile(&TemplateSource::view(view)) {
            Ok(key) => return self.render(&key, data),
            Err(err) => err,
        };

        match &self.fallback_view {
            Some(fallback) if err.is_not_found() && !self.config.throw_not_found => {
                warn!(view = %view, error = %err, fallback = %fallback.display(), "Rendering fallback view");
                let key = self.compile(&TemplateSource::File(fallback.clone()))?;
                self.render(&key, data)
            }
            _ => Err(err),
        }
    }

    pub fn render_inline(&self, markup: &str, data: &Data) -> ViewResult<String> {
        let key = self.compile(&TemplateSource::inline(markup))?;
        self.render(&key, data)
    }

    /// Render one component directly. Besides the registry and the autoload
    /// directory, `<componentsDir>/<tag>.<ext>` is tried.
    pub fn component(&self, tag: &str, data: &Data) -> ViewResult<String> {
        let prefix = format!("{}-", self.config.component_prefix);
        let tag = tag.strip_prefix(prefix.as_str()).unwrap_or(tag);

        let mut session = Session::new(self);
        let template = session.load_component(tag, true)?;
        session.render_template(tag, template, data.clone())
    }

    fn load_source(&self, source: &TemplateSource) -> ViewResult<String> {
        match source {
            TemplateSource::View(name) => self.read_view(&self.config.view_path(name), name),
            TemplateSource::File(path) => self.read_view(path, &path.display().to_string()),
            TemplateSource::Inline { markup, .. } => Ok(markup.clone()),
        }
    }

    fn read_view(&self, path: &Path, view: &str) -> ViewResult<String> {
        match self.fs.read_to_string(path) {
            Ok(text) => Ok(text),
            Err(CommonError::NotFound { .. }) => Err(ViewError::view_not_found(view)),
            Err(err) => Err(err.into()),
        }
    }
}

/// A component template ready to compile, with what its render needs
struct ComponentTemplate {
    text: String,
    origin: String,
    defaults: Data,
    hidden: Vec<String>,
    factory: Option<Arc<dyn Component>>,
}

impl ComponentTemplate {
    fn plain(text: String, origin: String) -> Self {
        Self {
            text,
            origin,
            defaults: Data::new(),
            hidden: Vec::new(),
            factory: None,
        }
    }
}

/// One compile request. Tracks the components being rendered so nesting can
/// be bounded and cycles reported.
struct Session<'e> {
    engine: &'e Engine,
    stack: Vec<String>,
}

impl<'e> Session<'e> {
    fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            stack: Vec::new(),
        }
    }

    fn compile_text(&mut self, text: &str, origin: &str) -> ViewResult<String> {
        let engine = self.engine;
        let config = &engine.config;

        let text = engine
            .inheritance
            .resolve(engine.fs.as_ref(), config, text, origin)?;
        let text = engine.expander.expand(&text, self)?;
        let text = engine.interpolator.compile(&text);
        DirectiveCompiler::new(&engine.directives, config.max_depth).compile(&text)
    }

    fn load_component(&self, tag: &str, components_dir: bool) -> ViewResult<ComponentTemplate> {
        let engine = self.engine;
        let extension = &engine.config.extension;

        let resolved = match engine.components.resolve(engine.fs.as_ref(), tag, extension) {
            Ok(resolved) => resolved,
            Err(err) if components_dir => {
                let path = self.component_view_path(tag);
                if !engine.fs.exists(&path) {
                    return Err(err);
                }
                ResolvedComponent::Autoloaded(path)
            }
            Err(err) => return Err(err),
        };

        let registered = match resolved {
            ResolvedComponent::Registered(registered) => registered,
            ResolvedComponent::Autoloaded(path) => {
                let origin = path.display().to_string();
                let text = engine.read_view(&path, &origin)?;
                return Ok(ComponentTemplate::plain(text, origin));
            }
        };

        let (source, factory) = match &registered.definition {
            ComponentDefinition::View(view) => (ComponentSource::View(view.clone()), None),
            ComponentDefinition::Inline(markup) => (ComponentSource::Inline(markup.clone()), None),
            ComponentDefinition::Factory(component) => (component.template(), Some(component.clone())),
        };
        let (text, origin) = match source {
            ComponentSource::View(view) => {
                let path = self.component_view_path(&view);
                let origin = path.display().to_string();
                (engine.read_view(&path, &origin)?, origin)
            }
            ComponentSource::Inline(markup) => (markup, format!("component:{}", tag)),
        };

        Ok(ComponentTemplate {
            text,
            origin,
            defaults: registered.defaults(),
            hidden: registered.hidden_props(),
            factory,
        })
    }

    fn component_view_path(&self, name: &str) -> PathBuf {
        let config = &self.engine.config;
        config
            .components_path()
            .join(config.with_extension(name.trim_start_matches('/')))
    }

    /// Compile the component's template in this session and render it with
    /// its defaults, then `props`, then the factory's data
    fn render_template(&mut self, tag: &str, template: ComponentTemplate, props: Data) -> ViewResult<String> {
        if self.stack.iter().any(|active| active == tag) {
            let mut call_stack = self.stack.clone();
            call_stack.push(tag.to_string());
            return Err(ViewError::RecursiveComponent {
                component: tag.to_string(),
                call_stack,
            });
        }
        if self.stack.len() >= self.engine.config.max_depth {
            return Err(ViewError::recursion_limit(
                "Component nesting",
                self.engine.config.max_depth,
            ));
        }

        let mut data = template.defaults;
        data.extend(props);
        if let Some(factory) = &template.factory {
            let extra = factory.data(&data);
            data.extend(extra);
        }

        self.stack.push(tag.to_string());
        let compiled = self.compile_text(&template.text, &template.origin);
        self.stack.pop();

        Ok(self.engine.renderer.render(&compiled?, &data)?)
    }
}

impl ComponentRenderer for Session<'_> {
    fn render_component(
        &mut self,
        tag: &str,
        attributes: &[(String, String)],
    ) -> ViewResult<RenderedComponent> {
        let template = self.load_component(tag, false)?;
        let hidden = template.hidden.clone();

        let mut props = Data::new();
        for (name, value) in attributes {
            props.insert(name.clone(), Value::String(value.clone()));
            if name.contains('-') {
                props.insert(name.to_snake_case(), Value::String(value.clone()));
            }
        }

        let html = self.render_template(tag, template, props)?;
        Ok(RenderedComponent { html, hidden })
    }
}
