//! Load command: resolve and instantiate extensions from the command line

use anyhow::{Context, Result};
use extload::{ConfigLocator, Export, ExtensionLoader, ExtensionSpec, ProjectDescriptor};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Placeholder printed for exports that are still callable
const CALLABLE_MARKER: &str = "<callable>";

pub struct LoadArgs {
    pub specs: Vec<String>,
    pub handlers: bool,
    pub project: Option<PathBuf>,
    pub root: PathBuf,
}

/// Parse a command-line spec: `path` or `path=<json>`.
///
/// Options start at the first `=` followed by `{`, `[`, `"` or `null`; any
/// other `=` is part of the path. A trailing `=` is a record spec without
/// options.
pub fn parse_spec_arg(arg: &str) -> Result<ExtensionSpec> {
    match split_options(arg) {
        None => Ok(ExtensionSpec::path(arg)),
        Some((path, "")) => Ok(ExtensionSpec::with_options(path, None)),
        Some((path, options)) => {
            let options: Value = serde_json::from_str(options)
                .with_context(|| format!("Invalid JSON options for {:?}", path))?;
            Ok(ExtensionSpec::with_options(path, Some(options)))
        }
    }
}

fn split_options(arg: &str) -> Option<(&str, &str)> {
    arg.match_indices('=').find_map(|(at, _)| {
        let options = &arg[at + 1..];
        let starts_json = options.is_empty()
            || options.starts_with(['{', '[', '"'])
            || options == "null";
        starts_json.then(|| (&arg[..at], options))
    })
}

/// Render loaded exports for output
pub fn render_exports(exports: &[Export]) -> Value {
    Value::Array(
        exports
            .iter()
            .map(|export| match export.as_value() {
                Some(value) => value.clone(),
                None => Value::String(CALLABLE_MARKER.to_string()),
            })
            .collect(),
    )
}

pub async fn run_load(args: LoadArgs) -> Result<ExitCode> {
    let specs = args
        .specs
        .iter()
        .map(|arg| parse_spec_arg(arg))
        .collect::<Result<Vec<_>>>()?;

    let project = match args.project {
        Some(path) => ProjectDescriptor::new(path),
        None => ConfigLocator::default()
            .locate(&args.root, &args.root)
            .with_context(|| format!("No project configuration found in {:?}", args.root))?,
    };
    debug!("Using project configuration {:?}", project.path());

    let loader = ExtensionLoader::builder().with_root(&args.root).build();
    let exports = if args.handlers {
        loader.load_handlers(&specs, &project).await?
    } else {
        loader.load_extensions(&specs, &project).await?
    };

    println!("{}", serde_json::to_string_pretty(&render_exports(&exports))?);
    Ok(ExitCode::SUCCESS)
}
