//! extload - dynamic extension loading
//!
//! This crate loads user-supplied extension modules (build plugins and
//! request middleware) by path:
//! - Module resolution for WebAssembly files (Extism) and host-registered
//!   native modules
//! - A process-wide transpiler registry, populated for the duration of one
//!   batch by a [`TranspilationScope`]
//! - Factory detection: callable exports are invoked with the spec's options
//! - Batch loading with input-ordered results and unconditional scope release
//! - Project config discovery and dependency manifest editing

pub mod error;
pub mod export;
pub mod instantiate;
pub mod loader;
pub mod locator;
pub mod manifest;
pub mod project;
pub mod resolver;
pub mod spec;
pub mod transpile;

pub use error::{ConfigError, LoaderError, ManifestError, Result};
pub use export::{CallArgs, Callable, Export, LoadedExtension};
pub use instantiate::instantiate;
pub use loader::{ExtensionLoader, ExtensionLoaderBuilder, LoadMode};
pub use locator::ConfigLocator;
pub use manifest::ManifestEditor;
pub use project::{ProjectConfig, ProjectDescriptor};
pub use resolver::{ModuleResolver, StaticModuleResolver, WasmModuleResolver};
pub use spec::ExtensionSpec;
pub use transpile::{
    ScopePolicy, TranspilationScope, Transpiler, TranspilerProvider, WatTranspilerProvider,
};
