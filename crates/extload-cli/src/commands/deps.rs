//! Deps command: add or remove manifest dependencies

use anyhow::{bail, Result};
use extload::manifest::DependencyMap;
use extload::ManifestEditor;
use std::path::Path;
use std::process::ExitCode;

/// Default version requirement for `name` without `@version`
const DEFAULT_VERSION: &str = "*";

/// Split `name@version` into its parts. Scoped names keep their leading `@`.
pub fn parse_package(package: &str) -> Result<(String, String)> {
    let (name, version) = match package.rfind('@') {
        Some(0) | None => (package, DEFAULT_VERSION),
        Some(at) => (&package[..at], &package[at + 1..]),
    };
    if name.is_empty() {
        bail!("Missing package name in {:?}", package);
    }
    if version.is_empty() {
        bail!("Missing version after '@' in {:?}", package);
    }
    Ok((name.to_string(), version.to_string()))
}

pub fn run_deps_add(
    manifest: &Path,
    packages: &[String],
    dev: bool,
    keep_existing: bool,
) -> Result<ExitCode> {
    let parsed = packages
        .iter()
        .map(|package| parse_package(package))
        .collect::<Result<DependencyMap>>()?;
    let (deps, dev_deps) = if dev {
        (DependencyMap::new(), parsed)
    } else {
        (parsed, DependencyMap::new())
    };

    let changed =
        ManifestEditor::new(manifest).add_dependencies(&deps, &dev_deps, keep_existing)?;
    if !changed {
        println!("{} is already up to date", manifest.display());
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_deps_remove(manifest: &Path, packages: &[String], dev: bool) -> Result<ExitCode> {
    let names: Vec<&str> = packages.iter().map(String::as_str).collect();
    let (deps, dev_deps): (&[&str], &[&str]) = if dev {
        (&[], names.as_slice())
    } else {
        (names.as_slice(), &[])
    };

    let changed = ManifestEditor::new(manifest).remove_dependencies(deps, dev_deps)?;
    if !changed {
        println!("Nothing to remove from {}", manifest.display());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use extload::manifest::{DEPENDENCIES, DEV_DEPENDENCIES};
    use tempfile::tempdir;

    #[test]
    fn test_parse_package() {
        assert_eq!(
            parse_package("logger@1.2").unwrap(),
            ("logger".to_string(), "1.2".to_string())
        );
        assert_eq!(
            parse_package("logger").unwrap(),
            ("logger".to_string(), "*".to_string())
        );
        assert_eq!(
            parse_package("@acme/auth@^2").unwrap(),
            ("@acme/auth".to_string(), "^2".to_string())
        );
        assert_eq!(
            parse_package("@acme/auth").unwrap(),
            ("@acme/auth".to_string(), "*".to_string())
        );
        assert!(parse_package("logger@").is_err());
    }

    #[test]
    fn test_add_then_remove_dev() {
        let temp = tempdir().unwrap();
        let manifest = temp.path().join("extload.toml");

        run_deps_add(&manifest, &["tester@0.3".to_string()], true, false).unwrap();
        let editor = ManifestEditor::new(&manifest);
        assert_eq!(
            editor.dependency(DEV_DEPENDENCIES, "tester").unwrap(),
            Some("0.3".to_string())
        );
        assert_eq!(editor.dependency(DEPENDENCIES, "tester").unwrap(), None);

        run_deps_remove(&manifest, &["tester".to_string()], true).unwrap();
        assert_eq!(editor.dependency(DEV_DEPENDENCIES, "tester").unwrap(), None);
    }
}
