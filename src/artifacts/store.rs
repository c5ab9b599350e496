//! Artifact persistence.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::Result;

/// Filesystem store for finished conversion artifacts.
///
/// Artifacts land in a flat directory under `{root}/{file_name}`. Bytes go
/// through a temporary `.part` file and a rename, so a file is only visible
/// under its final name once fully persisted.
#[derive(Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Directory the artifacts are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist artifact bytes under the given file name.
    ///
    /// # Returns
    ///
    /// The full path of the persisted file.
    pub async fn write(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;

        let final_path = self.root.join(file_name);
        let part_path = self.root.join(format!("{}.part", file_name));

        tokio::fs::write(&part_path, data).await?;
        tokio::fs::rename(&part_path, &final_path).await?;

        debug!(path = %final_path.display(), bytes = data.len(), "artifact persisted");
        Ok(final_path)
    }
}
