//! In-process modules registered by the host

use super::{normalize_path, ModuleResolver};
use crate::error::{LoaderError, Result};
use crate::export::Export;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::debug;

type Initializer = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Export>> + Send + Sync>;

struct NativeModule {
    init: Initializer,
    evaluated: OnceCell<Export>,
}

/// Resolves paths to modules implemented in Rust and registered up front.
///
/// A module's initializer runs the first time the module is loaded; its
/// export is cached for every later load. A failing initializer is retried
/// on the next load.
#[derive(Default, Clone)]
pub struct StaticModuleResolver {
    modules: Arc<RwLock<HashMap<PathBuf, Arc<NativeModule>>>>,
}

impl StaticModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module whose primary export is `export`
    pub fn register(&self, path: impl AsRef<Path>, export: Export) -> &Self {
        self.register_with(path, move || {
            let export = export.clone();
            async move { Ok(export) }
        })
    }

    /// Register a module evaluated by `init` on first load
    pub fn register_with<F, Fut>(&self, path: impl AsRef<Path>, init: F) -> &Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Export>> + Send + 'static,
    {
        let initializer: Initializer =
            Arc::new(move || -> BoxFuture<'static, anyhow::Result<Export>> { Box::pin(init()) });
        let module = Arc::new(NativeModule {
            init: initializer,
            evaluated: OnceCell::new(),
        });
        self.modules
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(normalize_path(path.as_ref()), module);
        self
    }

    /// Whether a module is registered under `path`
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.modules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&normalize_path(path.as_ref()))
    }
}

#[async_trait]
impl ModuleResolver for StaticModuleResolver {
    async fn load_module(&self, path: &Path) -> Result<Export> {
        let module = {
            let modules = self.modules.read().unwrap_or_else(|e| e.into_inner());
            modules.get(&normalize_path(path)).cloned()
        }
        .ok_or_else(|| LoaderError::ModuleNotFound {
            path: path.to_path_buf(),
        })?;

        debug!("Loading native module {:?}", path);
        let export = module
            .evaluated
            .get_or_try_init(|| (module.init)())
            .await
            .map_err(|source| LoaderError::module_load(path, source))?;
        Ok(export.clone())
    }
}
