//! On-disk store for compiled artifacts.

use crate::config::EngineConfig;
use crate::error::{ViewError, ViewResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Longest key kept, in characters
pub const MAX_KEY_LENGTH: usize = 100;

pub const ARTIFACT_EXTENSION: &str = "tpl";

/// Filesystem-safe name of a compiled artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Separators become `_`, `..` is dropped, then URL-safe base64 keeps the
/// last [`MAX_KEY_LENGTH`] characters.
pub fn derive_key(identity: &str) -> ArtifactKey {
    let normalized = identity.replace(['/', '\\'], "_").replace("..", "");
    let encoded = URL_SAFE_NO_PAD.encode(normalized.as_bytes());
    let start = encoded.len().saturating_sub(MAX_KEY_LENGTH);
    ArtifactKey(encoded[start..].to_string())
}

#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    use_cached: bool,
    writes: AtomicUsize,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, use_cached: bool) -> Self {
        Self {
            dir: dir.into(),
            use_cached,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.cache_dir(), config.use_cached)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, key: &ArtifactKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ARTIFACT_EXTENSION))
    }

    /// A stored artifact, only when reuse is enabled
    pub fn get(&self, key: &ArtifactKey) -> Option<String> {
        if !self.use_cached {
            return None;
        }
        match fs::read_to_string(self.path_of(key)) {
            Ok(content) => {
                debug!(key = %key, "Artifact cache hit");
                Some(content)
            }
            Err(_) => None,
        }
    }

    /// A stored artifact regardless of the reuse setting
    pub fn load(&self, key: &ArtifactKey) -> ViewResult<String> {
        match fs::read_to_string(self.path_of(key)) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ViewError::ArtifactNotFound {
                key: key.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub fn put(&self, key: &ArtifactKey, content: &str) -> ViewResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_of(key), content)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, bytes = content.len(), "Artifact written");
        Ok(())
    }

    /// Remove every stored artifact. `false` when any removal failed.
    pub fn clear(&self) -> bool {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return true,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "Can't read cache directory");
                return false;
            }
        };

        let mut cleared = true;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(_) => {
                    cleared = false;
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if let Err(err) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %err, "Can't remove artifact");
                cleared = false;
            }
        }
        cleared
    }

    /// Artifacts written by this store
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}
