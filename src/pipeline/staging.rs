use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use sha1::{Digest, Sha1};
use tracing::{debug, trace};

use crate::storage::local::fs_util;
use crate::types::error::BucketBrigadeError;
use crate::types::StagingRole;

/// Local working directory shared by every object of the current page.
///
/// Layout: `<root>/<originals|transformed>/<sha1 of key>/<file name of key>`.
/// The hashed directory keeps different keys apart, the file name keeps the
/// extension visible to the transform command.
#[derive(Debug, Clone)]
pub struct StagingCache {
    root: PathBuf,
}

impl StagingCache {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes the whole cache. Removing an absent cache is not an error.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(_) => {
                debug!(
                    cache_dir = self.root.to_string_lossy().to_string(),
                    "staging cache cleared."
                );
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!(BucketBrigadeError::StagingError(format!(
                "{}: {}",
                self.root.to_string_lossy(),
                e
            )))),
        }
    }

    /// Deterministic staging path of `key` in `role`. Parent directories are
    /// created on demand.
    pub async fn path_for(&self, role: StagingRole, key: &str) -> Result<PathBuf> {
        if fs_util::is_key_a_directory(key) {
            return Err(anyhow!(BucketBrigadeError::DirectoryKeyError(
                key.to_string()
            )));
        }

        let file_name = key.rsplit('/').next().unwrap_or(key);
        if file_name.is_empty() || file_name == "." || file_name == ".." {
            return Err(anyhow!(BucketBrigadeError::DirectoryTraversalError));
        }

        let directory = self
            .root
            .join(role.dir_name())
            .join(hex::encode(Sha1::digest(key.as_bytes())));

        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            anyhow!(BucketBrigadeError::StagingError(format!(
                "{}: {}",
                directory.to_string_lossy(),
                e
            )))
        })?;

        let path = directory.join(file_name);
        trace!(
            key = key,
            path = path.to_string_lossy().to_string(),
            "staging path prepared."
        );

        Ok(path)
    }
}
