// ==============================================================================
// workspace.rs - Per-Request Working Directories
// ==============================================================================
// Description: Request-scoped output areas and recursive cleanup
// Author: Matt Barham
// Created: 2026-10-07
// Modified: 2026-10-12
// Version: 1.0.0
// ==============================================================================
// Every request writes under `<base>/<request-id>/`, so concurrent requests
// never share artifact paths.
// ==============================================================================

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PipelineError, Result};

/// Working directory owned by a single request
#[derive(Debug, Clone)]
pub struct RequestWorkspace {
    id: Uuid,
    root: PathBuf,
}

impl RequestWorkspace {
    /// Create `<base>/<new-uuid>/`
    pub fn create(base: &Path) -> Result<Self> {
        Self::with_id(base, Uuid::new_v4())
    }

    pub fn with_id(base: &Path, id: Uuid) -> Result<Self> {
        let root = base.join(id.to_string());
        std::fs::create_dir_all(&root).map_err(|e| PipelineError::io(&root, e))?;
        debug!("Created workspace {:?}", root);
        Ok(Self { id, root })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create (if needed) and return a subdirectory of the workspace
    pub fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        Ok(dir)
    }

    /// Remove the workspace and everything in it
    pub fn cleanup(self) -> Result<usize> {
        remove_tree(&self.root)
    }
}

/// Remove a directory tree, deepest entries first. Returns the number of
/// files removed; a missing path is not an error.
pub fn remove_tree(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let mut files = 0;
    for entry in walkdir::WalkDir::new(path)
        .contents_first(true) // Files before directories
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let entry_path = entry.path();

        if entry.file_type().is_dir() {
            std::fs::remove_dir(entry_path).map_err(|e| PipelineError::io(entry_path, e))?;
        } else {
            std::fs::remove_file(entry_path).map_err(|e| PipelineError::io(entry_path, e))?;
            files += 1;
        }
    }

    info!("Removed {:?} ({} files)", path, files);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspaces_are_isolated() {
        let base = TempDir::new().unwrap();

        let first = RequestWorkspace::create(base.path()).unwrap();
        let second = RequestWorkspace::create(base.path()).unwrap();

        assert_ne!(first.id(), second.id());
        assert_ne!(first.root(), second.root());
        assert!(first.root().starts_with(base.path()));
        assert!(first.root().is_dir());
    }

    #[test]
    fn test_remove_tree() {
        let base = TempDir::new().unwrap();
        let workspace = RequestWorkspace::create(base.path()).unwrap();

        let nested = workspace.subdir("bundle/snp1").unwrap();
        std::fs::write(nested.join("violin_plot.png"), b"png").unwrap();
        std::fs::write(workspace.root().join("bundle.zip"), b"zip").unwrap();

        let root = workspace.root().to_path_buf();
        assert_eq!(workspace.cleanup().unwrap(), 2);
        assert!(!root.exists());

        assert_eq!(remove_tree(&root).unwrap(), 0);
    }
}
