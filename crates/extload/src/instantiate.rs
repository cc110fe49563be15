//! Turning a module's export into an extension instance

use crate::error::{LoaderError, Result};
use crate::export::{CallArgs, Export, LoadedExtension};
use crate::spec::ExtensionSpec;
use tracing::debug;

/// Arguments a factory receives for `spec`. A record passes its `options`
/// as the single argument even when they are absent; a bare path passes
/// none.
pub fn factory_args(spec: &ExtensionSpec) -> CallArgs {
    match spec {
        ExtensionSpec::PathOnly(_) => CallArgs::Empty,
        ExtensionSpec::PathWithOptions { options, .. } => CallArgs::Options(options.clone()),
    }
}

/// Produce the extension instance for `export`, loaded from `spec`.
///
/// Callable exports are factories and are invoked; anything else is already
/// an instance and is returned unchanged.
pub async fn instantiate(export: Export, spec: &ExtensionSpec) -> Result<LoadedExtension> {
    let factory = match export {
        Export::Callable(factory) => factory,
        instance => return Ok(instance),
    };

    let args = factory_args(spec);
    debug!("Invoking factory {:?} with {:?}", spec.module_path(), args);
    factory
        .call(args)
        .await
        .map_err(|source| LoaderError::Instantiation {
            path: spec.module_path().to_path_buf(),
            source,
        })
}
