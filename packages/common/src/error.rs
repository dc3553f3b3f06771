use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading template sources
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommonError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }
}
