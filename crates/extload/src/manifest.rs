//! Dependency edits on a TOML manifest
//!
//! Used by setup commands that add or remove the packages an extension
//! needs. Unrelated to loading itself.

use crate::error::ManifestError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, TableLike};
use tracing::{debug, info};

/// Table holding runtime dependencies
pub const DEPENDENCIES: &str = "dependencies";

/// Table holding development dependencies
pub const DEV_DEPENDENCIES: &str = "dev-dependencies";

/// Key holding the requirement in a table-form dependency
const VERSION_KEY: &str = "version";

/// Package name to version requirement
pub type DependencyMap = BTreeMap<String, String>;

/// Edits the dependency tables of one manifest file.
///
/// Edits go through `toml_edit`, so comments and layout outside the touched
/// entries are kept.
#[derive(Debug, Clone)]
pub struct ManifestEditor {
    path: PathBuf,
}

impl ManifestEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add `dependencies` and `dev_dependencies`, creating the tables and
    /// the file as needed. With `keep_existing_versions`, entries already
    /// present (in any form) are left alone. Table-form entries such as
    /// `{ version = "1", features = [..] }` only get their `version` updated.
    pub fn add_dependencies(
        &self,
        dependencies: &DependencyMap,
        dev_dependencies: &DependencyMap,
        keep_existing_versions: bool,
    ) -> Result<bool, ManifestError> {
        let mut manifest = self.read()?.unwrap_or_default();
        let mut changed = false;

        for (section, deps) in [
            (DEPENDENCIES, dependencies),
            (DEV_DEPENDENCIES, dev_dependencies),
        ] {
            if deps.is_empty() {
                continue;
            }
            let table = section_mut(&mut manifest, section)?;
            for (name, version) in deps {
                match table.get_mut(name) {
                    Some(_) if keep_existing_versions => {
                        debug!("Keeping existing dependency {}", name);
                    }
                    Some(entry) => changed |= set_version(entry, version),
                    None => {
                        table.insert(name, toml_edit::value(version.as_str()));
                        changed = true;
                    }
                }
            }
        }

        if changed {
            self.write(&manifest)?;
            info!("Updated dependencies in {:?}", self.path);
        }
        Ok(changed)
    }

    /// Remove `dependencies` and `dev_dependencies`. Returns whether the
    /// manifest changed; a missing manifest is left alone.
    pub fn remove_dependencies(
        &self,
        dependencies: &[&str],
        dev_dependencies: &[&str],
    ) -> Result<bool, ManifestError> {
        let Some(mut manifest) = self.read()? else {
            return Ok(false);
        };
        let mut changed = false;

        for (section, names) in [
            (DEPENDENCIES, dependencies),
            (DEV_DEPENDENCIES, dev_dependencies),
        ] {
            let Some(item) = manifest.get_mut(section) else {
                continue;
            };
            let table = item
                .as_table_like_mut()
                .ok_or_else(|| ManifestError::NotATable(section.to_string()))?;
            for name in names {
                changed |= table.remove(name).is_some();
            }
        }

        if changed {
            self.write(&manifest)?;
            info!("Removed dependencies from {:?}", self.path);
        }
        Ok(changed)
    }

    /// Version requirement recorded for `name` in `section`, read from a
    /// plain string entry or the `version` key of a table entry
    pub fn dependency(&self, section: &str, name: &str) -> Result<Option<String>, ManifestError> {
        let Some(manifest) = self.read()? else {
            return Ok(None);
        };
        let Some(entry) = manifest
            .get(section)
            .and_then(Item::as_table_like)
            .and_then(|table| table.get(name))
        else {
            return Ok(None);
        };
        let version = match entry.as_table_like() {
            Some(table) => table.get(VERSION_KEY).and_then(Item::as_str),
            None => entry.as_str(),
        };
        Ok(version.map(str::to_string))
    }

    fn read(&self) -> Result<Option<DocumentMut>, ManifestError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(content.parse::<DocumentMut>()?))
    }

    fn write(&self, manifest: &DocumentMut) -> Result<(), ManifestError> {
        std::fs::write(&self.path, manifest.to_string())?;
        Ok(())
    }
}

fn section_mut<'a>(
    manifest: &'a mut DocumentMut,
    section: &str,
) -> Result<&'a mut dyn TableLike, ManifestError> {
    manifest
        .entry(section)
        .or_insert(toml_edit::table())
        .as_table_like_mut()
        .ok_or_else(|| ManifestError::NotATable(section.to_string()))
}

/// Point `entry` at `version`. Returns whether anything changed.
fn set_version(entry: &mut Item, version: &str) -> bool {
    if let Some(table) = entry.as_table_like_mut() {
        if table.get(VERSION_KEY).and_then(Item::as_str) == Some(version) {
            return false;
        }
        table.insert(VERSION_KEY, toml_edit::value(version));
        return true;
    }
    if entry.as_str() == Some(version) {
        return false;
    }
    *entry = toml_edit::value(version);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn deps(entries: &[(&str, &str)]) -> DependencyMap {
        entries
            .iter()
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect()
    }

    #[test]
    fn test_add_creates_manifest_and_tables() {
        let temp = tempdir().unwrap();
        let editor = ManifestEditor::new(temp.path().join("extload.toml"));

        let changed = editor
            .add_dependencies(
                &deps(&[("wasi-http", "0.2")]),
                &deps(&[("extload-test", "1.0")]),
                false,
            )
            .unwrap();

        assert!(changed);
        assert_eq!(
            editor.dependency(DEPENDENCIES, "wasi-http").unwrap().as_deref(),
            Some("0.2")
        );
        assert_eq!(
            editor
                .dependency(DEV_DEPENDENCIES, "extload-test")
                .unwrap()
                .as_deref(),
            Some("1.0")
        );
    }

    #[test]
    fn test_keep_existing_versions() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("extload.toml");
        std::fs::write(&path, "[dependencies]\nwasi-http = \"0.1\"\n").unwrap();
        let editor = ManifestEditor::new(&path);

        let changed = editor
            .add_dependencies(&deps(&[("wasi-http", "0.2")]), &DependencyMap::new(), true)
            .unwrap();
        assert!(!changed);
        assert_eq!(
            editor.dependency(DEPENDENCIES, "wasi-http").unwrap().as_deref(),
            Some("0.1")
        );

        let changed = editor
            .add_dependencies(&deps(&[("wasi-http", "0.2")]), &DependencyMap::new(), false)
            .unwrap();
        assert!(changed);
        assert_eq!(
            editor.dependency(DEPENDENCIES, "wasi-http").unwrap().as_deref(),
            Some("0.2")
        );
    }

    #[test]
    fn test_remove_dependencies() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("extload.toml");
        std::fs::write(
            &path,
            "[compiler]\nextensions = [\"wat\"]\n\n[dependencies]\na = \"1\"\nb = \"2\"\n\n[dev-dependencies]\nc = \"3\"\n",
        )
        .unwrap();
        let editor = ManifestEditor::new(&path);

        assert!(editor.remove_dependencies(&["a"], &["c"]).unwrap());
        assert!(!editor.remove_dependencies(&["a"], &[]).unwrap());
        assert_eq!(editor.dependency(DEPENDENCIES, "a").unwrap(), None);
        assert_eq!(
            editor.dependency(DEPENDENCIES, "b").unwrap().as_deref(),
            Some("2")
        );

        // Unrelated sections survive the rewrite
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[compiler]"));
    }

    #[test]
    fn test_comments_survive_add_and_remove() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("extload.toml");
        std::fs::write(
            &path,
            "# project config\n[compiler]\nextensions = [\"wat\"] # compiled sources\n\n[dependencies]\na = \"1\"\nb = \"2\"\n",
        )
        .unwrap();
        let editor = ManifestEditor::new(&path);

        assert!(editor.remove_dependencies(&["a"], &[]).unwrap());
        assert!(editor
            .add_dependencies(&deps(&[("c", "3")]), &DependencyMap::new(), false)
            .unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# project config"));
        assert!(content.contains("# compiled sources"));
        assert!(!content.contains("a = "));
        assert!(content.contains("b = \"2\""));
        assert!(content.contains("c = \"3\""));
    }

    #[test]
    fn test_table_form_dependency_keeps_its_keys() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("extload.toml");
        std::fs::write(
            &path,
            "[dependencies]\nserde = { version = \"1\", features = [\"derive\"] }\n",
        )
        .unwrap();
        let editor = ManifestEditor::new(&path);

        // Present in table form counts as existing
        let changed = editor
            .add_dependencies(&deps(&[("serde", "2")]), &DependencyMap::new(), true)
            .unwrap();
        assert!(!changed);
        assert_eq!(
            editor.dependency(DEPENDENCIES, "serde").unwrap().as_deref(),
            Some("1")
        );

        // Updating rewrites only the version key
        let changed = editor
            .add_dependencies(&deps(&[("serde", "2")]), &DependencyMap::new(), false)
            .unwrap();
        assert!(changed);
        assert_eq!(
            editor.dependency(DEPENDENCIES, "serde").unwrap().as_deref(),
            Some("2")
        );
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("features = [\"derive\"]"));

        let changed = editor
            .add_dependencies(&deps(&[("serde", "2")]), &DependencyMap::new(), false)
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_remove_from_missing_manifest_is_noop() {
        let temp = tempdir().unwrap();
        let editor = ManifestEditor::new(temp.path().join("missing.toml"));
        assert!(!editor.remove_dependencies(&["a"], &["b"]).unwrap());
        assert!(!editor.path().exists());
    }

    #[test]
    fn test_non_table_section_is_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("extload.toml");
        std::fs::write(&path, "dependencies = \"oops\"\n").unwrap();

        let err = ManifestEditor::new(&path)
            .add_dependencies(&deps(&[("a", "1")]), &DependencyMap::new(), false)
            .unwrap_err();
        assert!(matches!(err, ManifestError::NotATable(_)));
    }
}
