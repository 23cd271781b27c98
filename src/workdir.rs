use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use tempfile::TempDir;

use crate::error::CleanupError;
use crate::ops::credentials::Credential;

/// Per-job execution context.
///
/// Owns an isolated directory that is removed by [`WorkingState::close`] or,
/// on any other exit path including unwinding, when the value is dropped.
#[derive(Debug)]
pub struct WorkingState {
    dir: TempDir,
    repo_dir_name: String,
    pub source_credential: Credential,
    pub destination_credential: Option<Credential>,
}

impl WorkingState {
    /// Allocate a fresh `repo_migration_*` directory under `root`.
    pub fn allocate(root: &Path, repo_dir_name: &str, source_credential: Credential) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create work root {}", root.display()))?;
        let dir = tempfile::Builder::new()
            .prefix("repo_migration_")
            .tempdir_in(root)
            .with_context(|| format!("Failed to create working directory in {}", root.display()))?;

        Ok(Self {
            dir,
            repo_dir_name: repo_dir_name.to_string(),
            source_credential,
            destination_credential: None,
        })
    }

    /// The directory allocated for this job.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the repository is cloned, inside [`Self::path`].
    pub fn repo_path(&self) -> PathBuf {
        self.dir.path().join(&self.repo_dir_name)
    }

    /// Remove the directory, reporting rather than swallowing a failure.
    pub fn close(self) -> Result<(), CleanupError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| CleanupError { path, source })
    }
}
