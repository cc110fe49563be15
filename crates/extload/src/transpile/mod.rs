//! Ad hoc source transpilation scoped to a load batch
//!
//! Extension sources that are not ready-to-run modules (WebAssembly text,
//! for instance) can only be loaded while a transpiler for their file
//! extension is installed in the process-wide [`TranspilerRegistry`]. A
//! [`TranspilationScope`] installs one for the duration of a batch and
//! removes it again on every exit path.

pub mod registry;
pub mod scope;
pub mod wasm_text;

use crate::project::ProjectDescriptor;
use std::path::Path;
use std::sync::Arc;

pub use registry::{registry, TranspilationRegistration, TranspilerRegistry};
pub use scope::{ScopePolicy, TranspilationScope};
pub use wasm_text::{WatTranspiler, WatTranspilerProvider};

/// Compiles extension sources into loadable module bytes
pub trait Transpiler: Send + Sync {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// File extensions (without the dot) this transpiler claims
    fn extensions(&self) -> Vec<String>;

    /// Compile `source`, read from `path`, into module bytes
    fn transpile(&self, path: &Path, source: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Creates the transpiler for a project when a scope is entered
pub trait TranspilerProvider: Send + Sync {
    /// Build a transpiler for `project`. Failing here fails the whole batch.
    fn install(&self, project: &ProjectDescriptor) -> anyhow::Result<Arc<dyn Transpiler>>;

    /// Called once when the scope that installed `transpiler` is released
    fn uninstall(&self, _transpiler: &dyn Transpiler) {}
}
