//! WebAssembly modules on disk, evaluated with Extism
//!
//! A module's primary export is decided by what the module exports:
//!
//! - `call`: the module itself is callable. Each invocation runs `call`
//!   with the arguments encoded as JSON (empty input for a zero-argument
//!   call, `null` for an absent argument).
//! - `value`: run once while the module is loaded; the JSON it outputs is
//!   the export.
//!
//! `.wasm` files are used as-is. Any other extension goes through the
//! transpiler installed for it, so text sources only load inside a
//! transpilation scope.

use super::{normalize_path, ModuleResolver};
use crate::error::{LoaderError, Result};
use crate::export::{CallArgs, Callable, Export};
use crate::transpile::{registry, Transpiler};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use extism::{Function, Manifest, Plugin, Wasm};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Export invoked when the module is used as a function
pub const CALL_EXPORT: &str = "call";

/// Export evaluated once to produce a plain value
pub const VALUE_EXPORT: &str = "value";

/// Extension of compiled modules
pub const WASM_EXTENSION: &str = "wasm";

/// Default memory cap for a module, in 64 KiB pages (256 MiB)
pub const DEFAULT_MEMORY_MAX_PAGES: u32 = 4096;

/// Resolves module paths to WebAssembly files under a root directory
pub struct WasmModuleResolver {
    /// Base directory for relative module paths
    root: PathBuf,
    /// Memory cap passed to every plugin manifest
    memory_max_pages: u32,
    /// Whether plugins get WASI
    wasi: bool,
    /// Evaluated modules by resolved path; never invalidated
    cache: RwLock<HashMap<PathBuf, Export>>,
}

impl WasmModuleResolver {
    /// Create a resolver for modules relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            memory_max_pages: DEFAULT_MEMORY_MAX_PAGES,
            wasi: true,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Set the per-module memory cap
    pub fn with_memory_max_pages(mut self, pages: u32) -> Self {
        self.memory_max_pages = pages;
        self
    }

    /// Enable or disable WASI for loaded modules
    pub fn with_wasi(mut self, wasi: bool) -> Self {
        self.wasi = wasi;
        self
    }

    /// Base directory for relative module paths
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of modules held in the cache
    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Find the file a module path refers to.
    ///
    /// An existing file wins. A path without an extension is then tried
    /// with `.wasm` and with each extension that currently has a transpiler
    /// installed.
    pub async fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        let candidate = normalize_path(&self.root.join(path));
        if is_file(&candidate).await {
            return Ok(candidate);
        }

        if candidate.extension().is_none() {
            let mut extensions = vec![WASM_EXTENSION.to_string()];
            extensions.extend(registry().source_extensions());
            for ext in extensions {
                let with_ext = candidate.with_extension(&ext);
                if is_file(&with_ext).await {
                    return Ok(with_ext);
                }
            }
        }

        Err(LoaderError::ModuleNotFound {
            path: path.to_path_buf(),
        })
    }

    async fn evaluate(&self, path: &Path, resolved: &Path) -> Result<Export> {
        let source = tokio::fs::read(resolved)
            .await
            .map_err(|e| LoaderError::module_load(path, e))?;

        let ext = resolved
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let transpiler: Option<Arc<dyn Transpiler>> = if ext == WASM_EXTENSION {
            None
        } else {
            let found = registry().lookup(&ext).ok_or_else(|| {
                LoaderError::module_load(
                    path,
                    anyhow!("no transpiler installed for .{} sources", ext),
                )
            })?;
            Some(found)
        };

        let resolved = resolved.to_path_buf();
        let memory_max_pages = self.memory_max_pages;
        let wasi = self.wasi;
        tokio::task::spawn_blocking(move || {
            let wasm = match transpiler {
                Some(transpiler) => transpiler.transpile(&resolved, &source)?,
                None => source,
            };
            instantiate_plugin(&resolved, wasm, memory_max_pages, wasi)
        })
        .await
        .map_err(|e| LoaderError::module_load(path, e))?
        .map_err(|e| LoaderError::module_load(path, e))
    }
}

#[async_trait]
impl ModuleResolver for WasmModuleResolver {
    async fn load_module(&self, path: &Path) -> Result<Export> {
        let resolved = self.resolve_path(path).await?;

        if let Some(cached) = self.cache.read().await.get(&resolved) {
            debug!("Using cached module: {:?}", resolved);
            return Ok(cached.clone());
        }

        debug!("Loading module {:?} from {:?}", path, resolved);
        let export = self.evaluate(path, &resolved).await?;

        self.cache
            .write()
            .await
            .entry(resolved)
            .or_insert_with(|| export.clone());
        Ok(export)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn instantiate_plugin(
    path: &Path,
    wasm: Vec<u8>,
    memory_max_pages: u32,
    wasi: bool,
) -> anyhow::Result<Export> {
    let manifest = Manifest::new([Wasm::data(wasm)]).with_memory_max(memory_max_pages);
    let mut plugin = Plugin::new(&manifest, std::iter::empty::<Function>(), wasi)
        .with_context(|| format!("Failed to create plugin for {:?}", path))?;

    if plugin.function_exists(CALL_EXPORT) {
        info!("Loaded callable module {:?}", path);
        return Ok(Export::Callable(Arc::new(WasmCallable {
            path: path.to_path_buf(),
            plugin: Arc::new(Mutex::new(plugin)),
        })));
    }

    if plugin.function_exists(VALUE_EXPORT) {
        let output = plugin
            .call::<&[u8], Vec<u8>>(VALUE_EXPORT, &[])
            .with_context(|| format!("Module {:?} failed during initialization", path))?;
        info!("Loaded value module {:?}", path);
        return Ok(Export::Value(decode_output(&output)?));
    }

    Err(anyhow!(
        "module exports neither `{}` nor `{}`",
        CALL_EXPORT,
        VALUE_EXPORT
    ))
}

/// Encode call arguments as plugin input
fn encode_args(args: &CallArgs) -> anyhow::Result<Vec<u8>> {
    match args {
        CallArgs::Empty => Ok(Vec::new()),
        CallArgs::Options(None) => Ok(b"null".to_vec()),
        CallArgs::Options(Some(value)) => Ok(serde_json::to_vec(value)?),
    }
}

/// Decode plugin output; no output means `null`
fn decode_output(output: &[u8]) -> anyhow::Result<serde_json::Value> {
    if output.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(output).context("Module output is not valid JSON")
}

/// The `call` export of a loaded plugin
struct WasmCallable {
    path: PathBuf,
    plugin: Arc<Mutex<Plugin>>,
}

#[async_trait]
impl Callable for WasmCallable {
    async fn call(&self, args: CallArgs) -> anyhow::Result<Export> {
        let input = encode_args(&args)?;
        let plugin = self.plugin.clone();
        debug!("Calling {:?} ({} byte input)", self.path, input.len());

        let output = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
            let mut plugin = plugin
                .lock()
                .map_err(|_| anyhow!("plugin lock poisoned"))?;
            plugin.call::<&[u8], Vec<u8>>(CALL_EXPORT, &input)
        })
        .await??;

        Ok(Export::Value(decode_output(&output)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_args_by_shape() {
        assert!(encode_args(&CallArgs::Empty).unwrap().is_empty());
        assert_eq!(encode_args(&CallArgs::Options(None)).unwrap(), b"null");
        assert_eq!(
            encode_args(&CallArgs::Options(Some(json!({ "x": 1 })))).unwrap(),
            br#"{"x":1}"#
        );
    }

    #[test]
    fn test_decode_output() {
        assert_eq!(decode_output(b"").unwrap(), serde_json::Value::Null);
        assert_eq!(
            decode_output(br#"{"name":"A"}"#).unwrap(),
            json!({ "name": "A" })
        );
        assert!(decode_output(b"not json").is_err());
    }
}
