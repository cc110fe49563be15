//! Discovery of the project descriptor

use crate::project::ProjectDescriptor;
use std::path::Path;
use tracing::debug;

/// Well-known project configuration filenames, in lookup order
pub const DEFAULT_CONFIG_FILES: &[&str] = &["extload.toml", "extload.json", ".extload.toml"];

/// Finds the project configuration among well-known filenames
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    filenames: Vec<String>,
}

impl Default for ConfigLocator {
    fn default() -> Self {
        Self::with_filenames(DEFAULT_CONFIG_FILES.iter().copied())
    }
}

impl ConfigLocator {
    /// Search for `filenames`, in order, instead of the defaults
    pub fn with_filenames<I, S>(filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filenames: filenames.into_iter().map(Into::into).collect(),
        }
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Return the first configuration file that exists, checking the project
    /// root before the workspace root. Finding nothing is not an error.
    pub fn locate(&self, project_root: &Path, workspace_root: &Path) -> Option<ProjectDescriptor> {
        for base in [project_root, workspace_root] {
            for name in &self.filenames {
                let candidate = base.join(name);
                if candidate.is_file() {
                    debug!("Found project config at {:?}", candidate);
                    return Some(ProjectDescriptor::new(candidate));
                }
            }
        }
        None
    }
}
