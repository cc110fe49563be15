//! Batch loading of extensions under one transpilation scope
//!
//! A batch resolves every spec concurrently, correlates results back to
//! their input positions, and releases the scope once every item has
//! settled. If any item fails, the first failure observed is returned after
//! the release; the other items still run to completion.

use crate::error::{LoaderError, Result};
use crate::export::{Export, LoadedExtension};
use crate::instantiate::instantiate;
use crate::project::ProjectDescriptor;
use crate::resolver::{ModuleResolver, WasmModuleResolver};
use crate::spec::ExtensionSpec;
use crate::transpile::{ScopePolicy, TranspilationScope, TranspilerProvider, WatTranspilerProvider};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How resolved exports are turned into results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Callable exports are factories and get invoked
    Factory,
    /// Exports are returned exactly as resolved
    Handler,
}

/// Loads batches of extensions
#[derive(Clone)]
pub struct ExtensionLoader {
    resolver: Arc<dyn ModuleResolver>,
    transpilers: Arc<dyn TranspilerProvider>,
    policy: ScopePolicy,
}

impl ExtensionLoader {
    /// Create a loader from a resolver and a transpiler provider
    pub fn new(
        resolver: Arc<dyn ModuleResolver>,
        transpilers: Arc<dyn TranspilerProvider>,
    ) -> Self {
        Self {
            resolver,
            transpilers,
            policy: ScopePolicy::default(),
        }
    }

    /// Loader for WebAssembly extensions under `root`, compiling text
    /// sources as configured by each batch's project file
    pub fn for_workspace(root: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(WasmModuleResolver::new(root)),
            Arc::new(WatTranspilerProvider),
        )
    }

    pub fn builder() -> ExtensionLoaderBuilder {
        ExtensionLoaderBuilder::default()
    }

    /// Policy applied when another batch holds the transpiler registry
    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    /// Load and instantiate `specs`. Results are in input order.
    ///
    /// An empty list returns immediately without entering a scope.
    pub async fn load_extensions(
        &self,
        specs: &[ExtensionSpec],
        project: &ProjectDescriptor,
    ) -> Result<Vec<LoadedExtension>> {
        self.load_batch(specs, project, LoadMode::Factory).await
    }

    /// Load `specs` and return their exports as-is, in input order
    pub async fn load_handlers(
        &self,
        specs: &[ExtensionSpec],
        project: &ProjectDescriptor,
    ) -> Result<Vec<Export>> {
        self.load_batch(specs, project, LoadMode::Handler).await
    }

    /// Load `specs` in the given mode
    pub async fn load_batch(
        &self,
        specs: &[ExtensionSpec],
        project: &ProjectDescriptor,
        mode: LoadMode,
    ) -> Result<Vec<Export>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        for (index, spec) in specs.iter().enumerate() {
            spec.validate(index)?;
        }

        let scope = TranspilationScope::enter(self.transpilers.clone(), project, self.policy).await?;
        let outcome = scope.run(self.load_all(specs, mode)).await;
        scope.release();

        match &outcome {
            Ok(loaded) => info!(
                "Loaded {} extension(s) for {:?}",
                loaded.len(),
                project.path()
            ),
            Err(err) => warn!("Extension batch for {:?} failed: {}", project.path(), err),
        }
        outcome
    }

    async fn load_all(&self, specs: &[ExtensionSpec], mode: LoadMode) -> Result<Vec<Export>> {
        let mut pending: FuturesUnordered<_> = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| async move { (index, self.load_one(spec, mode).await) })
            .collect();

        let mut slots: Vec<Option<Export>> = vec![None; specs.len()];
        let mut first_error: Option<LoaderError> = None;

        while let Some((index, result)) = pending.next().await {
            match result {
                Ok(export) => slots[index] = Some(export),
                Err(err) if first_error.is_none() => {
                    warn!("Extension {} failed: {}", index, err);
                    first_error = Some(err);
                }
                Err(err) => debug!("Discarding later failure of extension {}: {}", index, err),
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    async fn load_one(&self, spec: &ExtensionSpec, mode: LoadMode) -> Result<Export> {
        let export = self.resolver.load_module(spec.module_path()).await?;
        match mode {
            LoadMode::Factory => instantiate(export, spec).await,
            LoadMode::Handler => Ok(export),
        }
    }
}

/// Builder for [`ExtensionLoader`]
#[derive(Default)]
pub struct ExtensionLoaderBuilder {
    resolver: Option<Arc<dyn ModuleResolver>>,
    transpilers: Option<Arc<dyn TranspilerProvider>>,
    root: Option<PathBuf>,
    policy: ScopePolicy,
}

impl ExtensionLoaderBuilder {
    /// Resolve modules with `resolver` instead of the WebAssembly resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Create transpilers with `provider`
    pub fn with_transpilers(mut self, provider: Arc<dyn TranspilerProvider>) -> Self {
        self.transpilers = Some(provider);
        self
    }

    /// Root directory for the default WebAssembly resolver
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Policy for overlapping batches
    pub fn with_policy(mut self, policy: ScopePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> ExtensionLoader {
        let root = self.root.unwrap_or_else(|| PathBuf::from("."));
        ExtensionLoader {
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(WasmModuleResolver::new(root))),
            transpilers: self
                .transpilers
                .unwrap_or_else(|| Arc::new(WatTranspilerProvider)),
            policy: self.policy,
        }
    }
}
