//! Project descriptors and the compiler configuration they point to

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference to the compiler configuration used for one batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectDescriptor {
    path: PathBuf,
}

impl ProjectDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the configuration file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the configuration file
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Read and parse the configuration file.
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn load_config(&self) -> Result<ProjectConfig, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        if self.path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: self.path.clone(),
                source,
            })
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: self.path.clone(),
                source,
            })
        }
    }
}

impl From<&Path> for ProjectDescriptor {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for ProjectDescriptor {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

/// Parsed project configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub compiler: CompilerSection,
}

/// `[compiler]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerSection {
    /// Source file extensions compiled on the fly while a scope is active
    #[serde(default = "default_source_extensions")]
    pub extensions: Vec<String>,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            extensions: default_source_extensions(),
        }
    }
}

fn default_source_extensions() -> Vec<String> {
    vec!["wat".to_string()]
}
