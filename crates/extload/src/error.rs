//! Error types for the extension loader

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while loading a batch of extensions
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The transpiler for the batch could not be installed; nothing was loaded
    #[error("Failed to install transpiler for project {project:?}: {source}")]
    ScopeInstallation {
        project: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Another transpilation scope is active and the policy forbids waiting
    #[error("Transpilation scope for {active:?} is active; cannot enter scope for {requested:?}")]
    ScopeContention { active: PathBuf, requested: PathBuf },

    /// The extension spec is malformed
    #[error("Invalid extension spec at index {index}: {reason}")]
    InvalidSpec { index: usize, reason: String },

    /// The module path could not be resolved to a file
    #[error("Extension module not found: {path:?}")]
    ModuleNotFound { path: PathBuf },

    /// The module was found but failed to load or initialize
    #[error("Failed to load extension module {path:?}: {source}")]
    ModuleLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The module's factory export failed to produce an instance
    #[error("Failed to instantiate extension {path:?}: {source}")]
    Instantiation {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl LoaderError {
    /// Create a module load error for `path`
    pub fn module_load(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        LoaderError::ModuleLoad {
            path: path.into(),
            source: source.into(),
        }
    }

    /// The extension path this error refers to, if it is a per-item error
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            LoaderError::ModuleNotFound { path }
            | LoaderError::ModuleLoad { path, .. }
            | LoaderError::Instantiation { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Errors from reading a project configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO errors
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing errors
    #[error("Failed to parse JSON config {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// TOML parsing errors
    #[error("Failed to parse TOML config {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from editing a dependency manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest is not valid TOML
    #[error("TOML error: {0}")]
    Parse(#[from] toml_edit::TomlError),

    /// A dependency section exists but is not a table
    #[error("Manifest section [{0}] is not a table")]
    NotATable(String),
}
