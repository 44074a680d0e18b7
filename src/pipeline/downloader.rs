use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::pipeline::staging::StagingCache;
use crate::storage::local::fs_util;
use crate::storage::Storage;
use crate::types::{ObjectRecord, StagedFile, StagingRole};

/// Fetches source objects into the staging cache.
pub struct Downloader {
    source: Storage,
    staging: StagingCache,
}

impl Downloader {
    pub fn new(source: Storage, staging: StagingCache) -> Self {
        Self { source, staging }
    }

    pub async fn fetch(&self, object: &ObjectRecord) -> Result<StagedFile> {
        let key = object.key();
        let path = self.staging.path_for(StagingRole::Original, key).await?;

        let get_object_output = self.source.get_object(key).await?;

        let mut reader = get_object_output.body.into_async_read();
        let mut file = tokio::fs::File::create(&path)
            .await
            .context("tokio::fs::File::create() failed.")?;
        let size = tokio::io::copy(&mut reader, &mut file)
            .await
            .context("tokio::io::copy() failed.")?;
        file.flush().await.context("tokio::fs::File::flush() failed.")?;
        drop(file);

        fs_util::set_last_modified(&path, object.last_modified())
            .context("fs_util::set_last_modified() failed.")?;

        debug!(
            key = key,
            size = size,
            path = path.to_string_lossy().to_string(),
            "object downloaded."
        );

        Ok(StagedFile {
            role: StagingRole::Original,
            key: key.to_string(),
            path,
        })
    }
}
