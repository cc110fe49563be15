//! Locate command: report which project configuration a load would use

use anyhow::{bail, Result};
use extload::ConfigLocator;
use std::path::Path;
use std::process::ExitCode;

/// Print the located configuration file, searching `project_root` before
/// `workspace_root` (which defaults to `project_root`).
pub fn run_locate(project_root: &Path, workspace_root: Option<&Path>) -> Result<ExitCode> {
    let workspace_root = workspace_root.unwrap_or(project_root);
    match ConfigLocator::default().locate(project_root, workspace_root) {
        Some(project) => {
            println!("{}", project.path().display());
            Ok(ExitCode::SUCCESS)
        }
        None => bail!(
            "No project configuration found in {:?} or {:?}",
            project_root,
            workspace_root
        ),
    }
}
