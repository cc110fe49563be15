//! Process-wide registry of installed transpilers

use super::Transpiler;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

static REGISTRY: OnceLock<TranspilerRegistry> = OnceLock::new();

/// Returns the process-wide transpiler registry.
pub fn registry() -> &'static TranspilerRegistry {
    REGISTRY.get_or_init(TranspilerRegistry::default)
}

/// Handle for one active transpiler installation
#[derive(Debug, PartialEq, Eq)]
pub struct TranspilationRegistration {
    id: u64,
    extensions: Vec<String>,
}

impl TranspilationRegistration {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Extensions claimed by this installation
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

struct Entry {
    registration: u64,
    transpiler: Arc<dyn Transpiler>,
}

/// Maps source file extensions to the transpiler currently installed for
/// them. Only one scope may own the registry at a time; ownership is the
/// `batch_lock` permit.
#[derive(Default)]
pub struct TranspilerRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    next_id: AtomicU64,
    batch_lock: Arc<AsyncMutex<()>>,
    active: Mutex<Option<PathBuf>>,
}

impl TranspilerRegistry {
    /// Transpiler installed for `extension`, if any
    pub fn lookup(&self, extension: &str) -> Option<Arc<dyn Transpiler>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&extension.to_ascii_lowercase())
            .map(|entry| entry.transpiler.clone())
    }

    /// Extensions that currently have a transpiler installed, sorted
    pub fn source_extensions(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut extensions: Vec<String> = entries.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Project of the scope currently owning the registry
    pub fn active_project(&self) -> Option<PathBuf> {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn batch_lock(&self) -> Arc<AsyncMutex<()>> {
        self.batch_lock.clone()
    }

    pub(crate) fn set_active(&self, project: Option<PathBuf>) {
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = project;
    }

    pub(crate) fn install(&self, transpiler: Arc<dyn Transpiler>) -> TranspilationRegistration {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let extensions: Vec<String> = transpiler
            .extensions()
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for ext in &extensions {
            debug!("Registering transpiler '{}' for .{}", transpiler.name(), ext);
            entries.insert(
                ext.clone(),
                Entry {
                    registration: id,
                    transpiler: transpiler.clone(),
                },
            );
        }

        TranspilationRegistration { id, extensions }
    }

    /// Remove the entries owned by `registration`. Entries since taken over
    /// by another registration are left alone.
    pub(crate) fn remove(&self, registration: &TranspilationRegistration) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for ext in &registration.extensions {
            if entries
                .get(ext)
                .is_some_and(|entry| entry.registration == registration.id)
            {
                entries.remove(ext);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct Upper(Vec<String>);

    impl Transpiler for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn extensions(&self) -> Vec<String> {
            self.0.clone()
        }

        fn transpile(&self, _path: &Path, source: &[u8]) -> anyhow::Result<Vec<u8>> {
            Ok(source.to_ascii_uppercase())
        }
    }

    #[test]
    fn test_install_and_remove() {
        let registry = TranspilerRegistry::default();
        let registration =
            registry.install(Arc::new(Upper(vec![".Up".to_string(), "low".to_string()])));

        assert_eq!(registration.extensions(), ["up", "low"]);
        assert_eq!(registry.source_extensions(), vec!["low", "up"]);
        let transpiler = registry.lookup("UP").unwrap();
        assert_eq!(
            transpiler.transpile(Path::new("x.up"), b"abc").unwrap(),
            b"ABC"
        );

        registry.remove(&registration);
        assert!(registry.lookup("up").is_none());
        assert!(registry.source_extensions().is_empty());
    }

    #[test]
    fn test_remove_leaves_newer_registration() {
        let registry = TranspilerRegistry::default();
        let first = registry.install(Arc::new(Upper(vec!["up".to_string()])));
        let second = registry.install(Arc::new(Upper(vec!["up".to_string()])));
        assert_ne!(first.id(), second.id());

        registry.remove(&first);
        assert!(registry.lookup("up").is_some());

        registry.remove(&second);
        assert!(registry.lookup("up").is_none());
    }
}
