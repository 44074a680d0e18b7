use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::builders::GetObjectOutputBuilder;
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::{Response, StatusCode};
use aws_smithy_types::body::SdkBody;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageFactory, StorageTrait};
use crate::types::error::BucketBrigadeError;
use crate::types::token::PipelineCancellationToken;
use crate::types::SyncStatistics::SyncBytes;
use crate::types::{ObjectPage, ObjectRecord, StoragePath, SyncStatistics};
use crate::Config;

pub mod fs_util;

pub struct LocalStorageFactory {}

#[async_trait]
impl StorageFactory for LocalStorageFactory {
    async fn create(
        _config: Config,
        path: StoragePath,
        cancellation_token: PipelineCancellationToken,
        stats_sender: Sender<SyncStatistics>,
        _client_config: Option<ClientConfig>,
    ) -> Storage {
        LocalStorage::boxed_new(path, cancellation_token, stats_sender)
    }
}

/// A directory that stands in for a bucket. Keys map to relative paths,
/// ACLs and content types are ignored.
#[derive(Clone)]
struct LocalStorage {
    path: PathBuf,
    cancellation_token: PipelineCancellationToken,
    stats_sender: Sender<SyncStatistics>,
}

impl LocalStorage {
    fn boxed_new(
        path: StoragePath,
        cancellation_token: PipelineCancellationToken,
        stats_sender: Sender<SyncStatistics>,
    ) -> Storage {
        let local_path = if let StoragePath::Local(local_path) = path {
            local_path
        } else {
            panic!("local path not found")
        };

        let storage = LocalStorage {
            path: local_path,
            cancellation_token,
            stats_sender,
        };

        Box::new(storage)
    }

    /// Walks the whole tree but keeps only the `max_keys` smallest keys after
    /// `marker`, so a page never holds more than one page of records.
    async fn collect_page_records(
        &self,
        marker: Option<&str>,
        max_keys: usize,
    ) -> Result<Vec<ObjectRecord>> {
        if max_keys == 0 {
            return Ok(Vec::new());
        }

        let mut page: BinaryHeap<KeyOrderedRecord> = BinaryHeap::with_capacity(max_keys + 1);

        for entry in WalkDir::new(&self.path) {
            if self.cancellation_token.is_cancelled() {
                trace!("list_objects_page() canceled.");
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // removed between readdir and stat
                    if e.io_error()
                        .is_some_and(|inner| inner.kind() == io::ErrorKind::NotFound)
                    {
                        continue;
                    }

                    let path = e
                        .path()
                        .unwrap_or_else(|| Path::new(""))
                        .to_string_lossy()
                        .to_string();
                    let error = e.to_string();
                    warn!(path = path, error = error, "failed to list local files.");

                    return Err(anyhow!(e).context("failed to list local files."));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(key) = fs_util::file_path_to_key(&self.path, entry.path()) else {
                continue;
            };
            if marker.is_some_and(|marker| key.as_str() <= marker) {
                continue;
            }
            if page.len() == max_keys
                && page.peek().is_some_and(|largest| largest.0.key <= key)
            {
                continue;
            }

            page.push(KeyOrderedRecord(build_object_record(&entry, &key)?));
            if page.len() > max_keys {
                page.pop();
            }
        }

        Ok(page
            .into_sorted_vec()
            .into_iter()
            .map(|record| record.0)
            .collect())
    }
}

fn build_object_record(entry: &DirEntry, key: &str) -> Result<ObjectRecord> {
    let metadata = entry
        .metadata()
        .context("walkdir::DirEntry::metadata() failed.")?;
    let last_modified = metadata
        .modified()
        .context("std::fs::Metadata::modified() failed.")?;

    Ok(ObjectRecord::new(
        key,
        last_modified.into(),
        i64::try_from(metadata.len()).unwrap_or(i64::MAX),
    ))
}

/// Orders records bytewise by key, the order S3 lists in.
struct KeyOrderedRecord(ObjectRecord);

impl PartialEq for KeyOrderedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.0.key == other.0.key
    }
}

impl Eq for KeyOrderedRecord {}

impl PartialOrd for KeyOrderedRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyOrderedRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.key.cmp(&other.0.key)
    }
}

#[async_trait]
impl StorageTrait for LocalStorage {
    fn is_local_storage(&self) -> bool {
        true
    }

    async fn list_objects_page(
        &self,
        marker: Option<String>,
        max_keys: i32,
    ) -> Result<ObjectPage> {
        let max_keys = usize::try_from(max_keys).unwrap_or_default();

        let objects = self
            .collect_page_records(marker.as_deref(), max_keys)
            .await?;

        let next_marker = objects.last().map(|record| record.key.clone());

        Ok(ObjectPage {
            objects,
            next_marker,
        })
    }

    async fn get_object(&self, key: &str) -> Result<GetObjectOutput> {
        let path = fs_util::key_to_file_path(&self.path, key);

        if !path.is_file() {
            let response = Response::new(
                StatusCode::try_from(404).context("StatusCode::try_from() failed.")?,
                SdkBody::from(r#""#),
            );
            let get_object_error =
                GetObjectError::NoSuchKey(aws_sdk_s3::types::error::NoSuchKey::builder().build());

            return Err(anyhow!(SdkError::service_error(get_object_error, response)));
        }

        let metadata = tokio::fs::metadata(&path)
            .await
            .context("tokio::fs::metadata() failed.")?;
        let last_modified = metadata
            .modified()
            .context("std::fs::Metadata::modified() failed.")?;

        Ok(GetObjectOutputBuilder::default()
            .set_content_length(Some(metadata.len() as i64))
            .last_modified(DateTime::from(last_modified))
            .set_body(Some(
                ByteStream::from_path(&path)
                    .await
                    .context("ByteStream::from_path() failed.")?,
            ))
            .build())
    }

    async fn put_object(
        &self,
        key: &str,
        path: &Path,
        _content_type: Option<String>,
        _canned_acl: Option<ObjectCannedAcl>,
    ) -> Result<PutObjectOutput> {
        if fs_util::check_directory_traversal(key) {
            return Err(anyhow!(BucketBrigadeError::DirectoryTraversalError));
        }

        if fs_util::is_key_a_directory(key) {
            return Err(anyhow!(BucketBrigadeError::DirectoryKeyError(
                key.to_string()
            )));
        }

        let real_path = fs_util::key_to_file_path(&self.path, key);
        let temp_file = fs_util::create_temp_file_for(&real_path).await?;

        let size = tokio::fs::copy(path, temp_file.path())
            .await
            .context("tokio::fs::copy() failed.")?;
        temp_file
            .persist(&real_path)
            .context("NamedTempFile::persist() failed.")?;

        self.send_stats(SyncBytes(size)).await;

        let real_path = real_path.to_string_lossy().to_string();
        debug!(
            key = key,
            real_path = real_path,
            size = size,
            "put_object() completed."
        );

        Ok(PutObjectOutput::builder().build())
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        None
    }

    fn get_stats_sender(&self) -> Sender<SyncStatistics> {
        self.stats_sender.clone()
    }

    async fn send_stats(&self, stats: SyncStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }
}
