use anyhow::Result;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use tracing::debug;

use crate::config::UploadConfig;
use crate::storage::Storage;
use crate::types::StagedFile;

pub struct Uploader {
    target: Storage,
    config: UploadConfig,
}

impl Uploader {
    pub fn new(target: Storage, config: UploadConfig) -> Self {
        Self { target, config }
    }

    /// Writes the transformed file under the same key it was listed with.
    pub async fn push(&self, key: &str, transformed: &StagedFile) -> Result<PutObjectOutput> {
        let content_type = self.config.content_type_for(key);

        debug!(
            key = key,
            content_type = content_type,
            acl = self.config.canned_acl.as_ref().map(|acl| acl.as_str()),
            "uploading transformed object."
        );

        self.target
            .put_object(
                key,
                &transformed.path,
                Some(content_type),
                self.config.canned_acl.clone(),
            )
            .await
    }
}
