use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Object, ObjectCannedAcl};
use aws_sdk_s3::Client;
use aws_smithy_types_convert::date_time::DateTimeExt;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageFactory, StorageTrait};
use crate::types::token::PipelineCancellationToken;
use crate::types::SyncStatistics::{SyncBytes, SyncSkip};
use crate::types::{ObjectPage, ObjectRecord, StoragePath, SyncStatistics};
use crate::Config;

mod client_builder;

pub struct S3StorageFactory {}

#[async_trait]
impl StorageFactory for S3StorageFactory {
    async fn create(
        _config: Config,
        path: StoragePath,
        _cancellation_token: PipelineCancellationToken,
        stats_sender: Sender<SyncStatistics>,
        client_config: Option<ClientConfig>,
    ) -> Storage {
        let client_config = client_config.unwrap_or_else(|| panic!("s3 client config not found"));

        S3Storage::boxed_new(
            path,
            stats_sender,
            Some(Arc::new(client_config.create_client().await)),
        )
        .await
    }
}

#[derive(Clone)]
struct S3Storage {
    bucket: String,
    prefix: String,
    client: Option<Arc<Client>>,
    stats_sender: Sender<SyncStatistics>,
}

impl S3Storage {
    async fn boxed_new(
        path: StoragePath,
        stats_sender: Sender<SyncStatistics>,
        client: Option<Arc<Client>>,
    ) -> Storage {
        let (bucket, prefix) = if let StoragePath::S3 { bucket, prefix } = path {
            (bucket, prefix)
        } else {
            panic!("s3 path not found")
        };

        let storage = S3Storage {
            bucket,
            prefix,
            client,
            stats_sender,
        };

        Box::new(storage)
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_deref()
            .ok_or_else(|| anyhow!("s3 client not initialized."))
    }

    fn build_object_record(&self, object: &Object, key: &str) -> Result<ObjectRecord> {
        let last_modified = object
            .last_modified()
            .ok_or_else(|| anyhow!("last_modified not found: {}", key))?
            .to_chrono_utc()
            .context("aws_smithy_types::DateTime::to_chrono_utc() failed.")?;

        Ok(ObjectRecord::new(
            key,
            last_modified,
            object.size().unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn is_local_storage(&self) -> bool {
        false
    }

    async fn list_objects_page(
        &self,
        marker: Option<String>,
        max_keys: i32,
    ) -> Result<ObjectPage> {
        let list_objects_output = self
            .client()?
            .list_objects()
            .bucket(&self.bucket)
            .prefix(&self.prefix)
            .set_marker(marker.clone())
            .max_keys(max_keys)
            .send()
            .await
            .context("aws_sdk_s3::client::list_objects() failed.")?;

        let mut objects = Vec::new();
        let mut next_marker = None;

        // The marker is the last raw key of the page, including keys skipped below.
        for object in list_objects_output.contents() {
            let Some(raw_key) = object.key() else {
                continue;
            };
            next_marker = Some(raw_key.to_string());

            let key_without_prefix = remove_s3_prefix(raw_key, &self.prefix);
            if key_without_prefix.is_empty() {
                self.send_stats(SyncSkip {
                    key: raw_key.to_string(),
                })
                .await;

                debug!(key = raw_key, "key that is same as prefix is skipped.");

                continue;
            }

            objects.push(self.build_object_record(object, &key_without_prefix)?);
        }

        let marker = marker.unwrap_or_default();
        trace!(
            bucket = self.bucket,
            prefix = self.prefix,
            marker = marker,
            listed = objects.len(),
            "list_objects() page completed."
        );

        Ok(ObjectPage {
            objects,
            next_marker,
        })
    }

    async fn get_object(&self, key: &str) -> Result<GetObjectOutput> {
        self.client()?
            .get_object()
            .bucket(&self.bucket)
            .key(generate_full_key(&self.prefix, key))
            .send()
            .await
            .context("aws_sdk_s3::client::get_object() failed.")
    }

    async fn put_object(
        &self,
        key: &str,
        path: &Path,
        content_type: Option<String>,
        canned_acl: Option<ObjectCannedAcl>,
    ) -> Result<PutObjectOutput> {
        let size = tokio::fs::metadata(path)
            .await
            .context("tokio::fs::metadata() failed.")?
            .len();
        let body = ByteStream::from_path(path)
            .await
            .context("ByteStream::from_path() failed.")?;

        let target_key = generate_full_key(&self.prefix, key);
        let put_object_output = self
            .client()?
            .put_object()
            .bucket(&self.bucket)
            .key(&target_key)
            .content_length(size as i64)
            .set_content_type(content_type)
            .set_acl(canned_acl)
            .body(body)
            .send()
            .await
            .context("aws_sdk_s3::client::put_object() failed.")?;

        self.send_stats(SyncBytes(size)).await;

        debug!(
            key = key,
            target_bucket = self.bucket,
            target_key = target_key,
            size = size,
            "put_object() completed."
        );

        Ok(put_object_output)
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        self.client.clone()
    }

    fn get_stats_sender(&self) -> Sender<SyncStatistics> {
        self.stats_sender.clone()
    }

    async fn send_stats(&self, stats: SyncStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }
}

pub fn remove_s3_prefix(key: &str, prefix: &str) -> String {
    key.replacen(prefix, "", 1)
}

pub fn generate_full_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}
