//! Extension specs as written in build and serve configuration
//!
//! A spec is either a bare path or a `{ path, options }` record. The two
//! shapes are kept distinct all the way to instantiation: a factory export
//! addressed by a bare path is called with no arguments, while one addressed
//! by a record is called with exactly the record's `options`, even when
//! those are absent.

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference to one extension module plus optional factory options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionSpec {
    /// A bare module path
    PathOnly(PathBuf),
    /// A module path with options for its factory
    PathWithOptions {
        path: PathBuf,
        #[serde(default)]
        options: Option<serde_json::Value>,
    },
}

impl ExtensionSpec {
    /// Create a bare path spec
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ExtensionSpec::PathOnly(path.into())
    }

    /// Create a record spec carrying `options`
    pub fn with_options(path: impl Into<PathBuf>, options: Option<serde_json::Value>) -> Self {
        ExtensionSpec::PathWithOptions {
            path: path.into(),
            options,
        }
    }

    /// Module path this spec refers to
    pub fn module_path(&self) -> &Path {
        match self {
            ExtensionSpec::PathOnly(path) | ExtensionSpec::PathWithOptions { path, .. } => path,
        }
    }

    /// Check the non-empty path invariant. `index` is the spec's position in
    /// its batch and is reported in the error.
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.module_path().as_os_str().is_empty() {
            return Err(LoaderError::InvalidSpec {
                index,
                reason: "extension path is empty".to_string(),
            });
        }
        Ok(())
    }
}

impl From<&str> for ExtensionSpec {
    fn from(path: &str) -> Self {
        ExtensionSpec::PathOnly(PathBuf::from(path))
    }
}

impl From<String> for ExtensionSpec {
    fn from(path: String) -> Self {
        ExtensionSpec::PathOnly(PathBuf::from(path))
    }
}

impl From<PathBuf> for ExtensionSpec {
    fn from(path: PathBuf) -> Self {
        ExtensionSpec::PathOnly(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_both_shapes() {
        let specs: Vec<ExtensionSpec> = serde_json::from_value(json!([
            "./pluginA",
            { "path": "./pluginB", "options": { "verbose": true } },
            { "path": "./pluginC" },
            { "path": "./pluginD", "options": null }
        ]))
        .unwrap();

        assert_eq!(specs[0], ExtensionSpec::path("./pluginA"));
        assert_eq!(
            specs[1],
            ExtensionSpec::with_options("./pluginB", Some(json!({ "verbose": true })))
        );
        // A record without options is still a record
        assert_eq!(specs[2], ExtensionSpec::with_options("./pluginC", None));
        assert_eq!(specs[3], ExtensionSpec::with_options("./pluginD", None));
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Build {
            plugins: Vec<ExtensionSpec>,
        }

        let build: Build = toml::from_str(
            r#"
plugins = ["./a.wasm", { path = "./b.wat", options = { level = 2 } }]
"#,
        )
        .unwrap();

        assert_eq!(build.plugins[0].module_path(), Path::new("./a.wasm"));
        assert_eq!(
            build.plugins[1],
            ExtensionSpec::with_options("./b.wat", Some(json!({ "level": 2 })))
        );
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let err = ExtensionSpec::path("").validate(3).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidSpec { index: 3, .. }));

        let err = ExtensionSpec::with_options("", None).validate(0).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidSpec { index: 0, .. }));

        assert!(ExtensionSpec::path("./ok").validate(0).is_ok());
    }
}
