//! WebAssembly text compiler

use super::{Transpiler, TranspilerProvider};
use crate::project::ProjectDescriptor;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Compiles WebAssembly text sources to binary modules
#[derive(Debug, Clone)]
pub struct WatTranspiler {
    extensions: Vec<String>,
}

impl WatTranspiler {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }
}

impl Default for WatTranspiler {
    fn default() -> Self {
        Self::new(vec!["wat".to_string()])
    }
}

impl Transpiler for WatTranspiler {
    fn name(&self) -> &str {
        "wat"
    }

    fn extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }

    fn transpile(&self, path: &Path, source: &[u8]) -> anyhow::Result<Vec<u8>> {
        debug!("Compiling {:?} ({} bytes)", path, source.len());
        let wasm = wat::parse_bytes(source)
            .with_context(|| format!("Failed to compile WebAssembly text {:?}", path))?;
        Ok(wasm.into_owned())
    }
}

/// Installs a [`WatTranspiler`] configured from the project file's
/// `[compiler]` section
#[derive(Debug, Clone, Copy, Default)]
pub struct WatTranspilerProvider;

impl TranspilerProvider for WatTranspilerProvider {
    fn install(&self, project: &ProjectDescriptor) -> anyhow::Result<Arc<dyn Transpiler>> {
        let config = project.load_config()?;
        if config.compiler.extensions.is_empty() {
            anyhow::bail!("[compiler] extensions is empty in {:?}", project.path());
        }
        Ok(Arc::new(WatTranspiler::new(config.compiler.extensions)))
    }
}
