//! Module resolution: path in, primary export out
//!
//! Resolvers know nothing about factories or options; turning an export into
//! an extension instance is the instantiator's job.

pub mod native;
pub mod wasm;

use crate::error::Result;
use crate::export::Export;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

pub use native::StaticModuleResolver;
pub use wasm::WasmModuleResolver;

/// Loads one module by path and returns its primary export
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Resolve and evaluate the module at `path`.
    ///
    /// Fails with `ModuleNotFound` when nothing exists at `path` and with
    /// `ModuleLoad` when the module's own initialization fails. Must be safe
    /// to call concurrently for distinct paths.
    async fn load_module(&self, path: &Path) -> Result<Export>;
}

/// Lexically normalize a module path: drop `.` components and fold `..`
/// where possible. Does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
