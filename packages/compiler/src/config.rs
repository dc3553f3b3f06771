use crate::error::{ViewError, ViewResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "stencil.config.json";

/// Engine configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Directory view names are resolved against
    #[serde(default = "default_views_path")]
    pub views_path: PathBuf,

    /// Root of the artifact cache; artifacts live in `<cachePath>/views`
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Reuse artifacts that are already on disk
    #[serde(default)]
    pub use_cached: bool,

    /// Surface `ViewNotFound` instead of rendering the fallback view
    #[serde(default = "default_throw_not_found")]
    pub throw_not_found: bool,

    #[serde(default = "default_component_prefix")]
    pub component_prefix: String,

    /// Component templates, relative to `viewsPath`
    #[serde(default = "default_components_dir")]
    pub components_dir: String,

    /// Directory searched for unregistered component tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoload_components: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_view: Option<String>,

    /// Template file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Bound on include nesting, component nesting and directive passes
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Bound on `for`/`while`/`do-while` iterations at render time
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,
}

fn default_views_path() -> PathBuf {
    PathBuf::from("views")
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("cache")
}

fn default_throw_not_found() -> bool {
    true
}

fn default_component_prefix() -> String {
    "app".to_string()
}

fn default_components_dir() -> String {
    "components".to_string()
}

fn default_extension() -> String {
    "html".to_string()
}

fn default_max_depth() -> usize {
    32
}

fn default_max_loop_iterations() -> usize {
    stencil_runtime::DEFAULT_MAX_LOOP_ITERATIONS
}

impl EngineConfig {
    pub fn new(views_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            views_path: views_path.into(),
            cache_path: cache_path.into(),
            ..Self::default()
        }
    }

    /// Load config from a directory. Relative paths in the file are resolved
    /// against that directory.
    pub fn load(dir: impl AsRef<Path>) -> ViewResult<Self> {
        let dir = dir.as_ref();
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if !config_path.exists() {
            // Return default config if none exists
            return Ok(Self::default().relative_to(dir));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|err| ViewError::Config(format!("{}: {}", config_path.display(), err)))?;
        config.validate()?;
        Ok(config.relative_to(dir))
    }

    pub fn validate(&self) -> ViewResult<()> {
        if self.component_prefix.trim().is_empty() {
            return Err(ViewError::Config("componentPrefix can't be empty".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ViewError::Config("maxDepth must be at least 1".to_string()));
        }
        Ok(())
    }

    fn relative_to(mut self, dir: &Path) -> Self {
        let resolve = |path: &PathBuf| {
            if path.is_relative() {
                dir.join(path)
            } else {
                path.clone()
            }
        };
        self.views_path = resolve(&self.views_path);
        self.cache_path = resolve(&self.cache_path);
        self.autoload_components = self.autoload_components.as_ref().map(resolve);
        self
    }

    /// Directory holding compiled artifacts
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_path.join("views")
    }

    pub fn components_path(&self) -> PathBuf {
        self.views_path.join(&self.components_dir)
    }

    /// `name` with the template extension appended unless already present
    pub fn with_extension(&self, name: &str) -> String {
        let suffix = format!(".{}", self.extension);
        if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{}{}", name, suffix)
        }
    }

    /// Path of a view: spaces stripped, extension appended, resolved under `viewsPath`
    pub fn view_path(&self, view: &str) -> PathBuf {
        let name: String = view.chars().filter(|c| *c != ' ').collect();
        let file = self.with_extension(name.trim_start_matches('/'));
        self.views_path.join(file)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            views_path: default_views_path(),
            cache_path: default_cache_path(),
            use_cached: false,
            throw_not_found: default_throw_not_found(),
            component_prefix: default_component_prefix(),
            components_dir: default_components_dir(),
            autoload_components: None,
            fallback_view: None,
            extension: default_extension(),
            max_depth: default_max_depth(),
            max_loop_iterations: default_max_loop_iterations(),
        }
    }
}
