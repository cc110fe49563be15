//! Batch-wide transpilation scope

use super::registry::{registry, TranspilationRegistration};
use super::{Transpiler, TranspilerProvider};
use crate::error::{LoaderError, Result};
use crate::project::ProjectDescriptor;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

tokio::task_local! {
    static ACTIVE_PROJECT: PathBuf;
}

/// What to do when another batch already owns the transpiler registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopePolicy {
    /// Wait until the other batch releases its scope.
    ///
    /// Nested batches are recognised only on the task driving the outer
    /// batch. A factory that hands a new batch to a `tokio::spawn`ed task and
    /// awaits it waits forever: the outer batch cannot release until that
    /// factory returns. Use [`Reject`](Self::Reject) if factories may do this.
    #[default]
    Serialize,
    /// Fail immediately with [`LoaderError::ScopeContention`]
    Reject,
}

struct Installed {
    registration: TranspilationRegistration,
    transpiler: Arc<dyn Transpiler>,
    _permit: OwnedMutexGuard<()>,
}

/// An installed transpiler, owned by one batch.
///
/// Released by [`release`](Self::release), or when dropped if the owner
/// never got that far. Either way the uninstall runs exactly once.
pub struct TranspilationScope {
    project: ProjectDescriptor,
    provider: Arc<dyn TranspilerProvider>,
    installed: Option<Installed>,
}

impl TranspilationScope {
    /// Install the provider's transpiler for `project`.
    ///
    /// Entering from inside a future already running under [`run`](Self::run)
    /// is rejected regardless of `policy`: the outer batch holds the
    /// registry until its own items finish.
    pub async fn enter(
        provider: Arc<dyn TranspilerProvider>,
        project: &ProjectDescriptor,
        policy: ScopePolicy,
    ) -> Result<Self> {
        if let Ok(active) = ACTIVE_PROJECT.try_with(|active| active.clone()) {
            return Err(LoaderError::ScopeContention {
                active,
                requested: project.path().to_path_buf(),
            });
        }

        let registry = registry();
        let lock = registry.batch_lock();
        let permit = match policy {
            ScopePolicy::Serialize => lock.lock_owned().await,
            ScopePolicy::Reject => lock.try_lock_owned().map_err(|_| {
                LoaderError::ScopeContention {
                    active: registry.active_project().unwrap_or_default(),
                    requested: project.path().to_path_buf(),
                }
            })?,
        };

        let transpiler =
            provider
                .install(project)
                .map_err(|source| LoaderError::ScopeInstallation {
                    project: project.path().to_path_buf(),
                    source,
                })?;

        registry.set_active(Some(project.path().to_path_buf()));
        let registration = registry.install(transpiler.clone());
        info!(
            "Installed transpiler '{}' for {:?} (.{})",
            transpiler.name(),
            project.path(),
            registration.extensions().join(", .")
        );

        Ok(Self {
            project: project.clone(),
            provider,
            installed: Some(Installed {
                registration,
                transpiler,
                _permit: permit,
            }),
        })
    }

    /// Project this scope was entered for
    pub fn project(&self) -> &ProjectDescriptor {
        &self.project
    }

    /// Whether the transpiler is still installed
    pub fn is_active(&self) -> bool {
        self.installed.is_some()
    }

    /// Drive `fut` as part of this scope's batch
    pub async fn run<F: Future>(&self, fut: F) -> F::Output {
        ACTIVE_PROJECT
            .scope(self.project.path().to_path_buf(), fut)
            .await
    }

    /// Uninstall the transpiler and hand the registry to the next batch
    pub fn release(mut self) {
        self.uninstall();
    }

    fn uninstall(&mut self) {
        let Some(installed) = self.installed.take() else {
            return;
        };

        let registry = registry();
        registry.remove(&installed.registration);
        self.provider.uninstall(installed.transpiler.as_ref());
        registry.set_active(None);
        info!(
            "Released transpiler '{}' for {:?}",
            installed.transpiler.name(),
            self.project.path()
        );
        // Permit drops here, after the registry is clean
        drop(installed);
        debug!("Transpilation scope closed");
    }
}

impl Drop for TranspilationScope {
    fn drop(&mut self) {
        self.uninstall();
    }
}
