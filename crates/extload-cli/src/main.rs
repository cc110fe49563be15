use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::{run_deps_add, run_deps_remove, run_load, run_locate, LoadArgs};

/// extload - load WebAssembly build plugins and middleware by path
#[derive(Parser)]
#[command(name = "extload")]
#[command(about = "Load extension modules under a batch transpilation scope", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load extensions and print their exports as JSON
    Load {
        /// Extension specs: a path, or `path=<json options>`. Options begin
        /// at an `=` followed by `{`, `[`, `"` or `null`; a trailing `=`
        /// means no options. Other `=` characters belong to the path.
        #[arg(required = true)]
        specs: Vec<String>,
        /// Return exports as-is instead of invoking factories
        #[arg(long)]
        handlers: bool,
        /// Project configuration file (located automatically when omitted)
        #[arg(short, long)]
        project: Option<PathBuf>,
        /// Directory module paths are relative to
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },
    /// Print the project configuration file that would be used
    Locate {
        /// Project root, searched first
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
        /// Workspace root, searched second
        #[arg(long)]
        workspace_root: Option<PathBuf>,
    },
    /// Edit manifest dependencies
    Deps {
        #[command(subcommand)]
        action: DepsAction,
    },
}

#[derive(Subcommand)]
enum DepsAction {
    /// Add dependencies given as `name@version`
    Add {
        packages: Vec<String>,
        /// Manifest to edit
        #[arg(short, long, default_value = "extload.toml")]
        manifest: PathBuf,
        /// Add to dev-dependencies
        #[arg(long)]
        dev: bool,
        /// Leave versions of already-declared packages untouched
        #[arg(long)]
        keep_existing: bool,
    },
    /// Remove dependencies by name
    Remove {
        packages: Vec<String>,
        /// Manifest to edit
        #[arg(short, long, default_value = "extload.toml")]
        manifest: PathBuf,
        /// Remove from dev-dependencies
        #[arg(long)]
        dev: bool,
    },
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let result = match cli.command {
        Commands::Load {
            specs,
            handlers,
            project,
            root,
        } => {
            run_load(LoadArgs {
                specs,
                handlers,
                project,
                root,
            })
            .await
        }
        Commands::Locate {
            project_root,
            workspace_root,
        } => run_locate(&project_root, workspace_root.as_deref()),
        Commands::Deps { action } => match action {
            DepsAction::Add {
                packages,
                manifest,
                dev,
                keep_existing,
            } => run_deps_add(&manifest, &packages, dev, keep_existing),
            DepsAction::Remove {
                packages,
                manifest,
                dev,
            } => run_deps_remove(&manifest, &packages, dev),
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
