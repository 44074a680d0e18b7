use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::operation::put_object::PutObjectOutput;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use dyn_clone::DynClone;

use crate::config::ClientConfig;
use crate::types::token::PipelineCancellationToken;
use crate::types::{ObjectPage, StoragePath, SyncStatistics};
use crate::Config;

pub mod local;
pub mod s3;

pub type Storage = Box<dyn StorageTrait + Send + Sync>;

pub struct StoragePair {
    pub source: Storage,
    pub target: Storage,
}

#[async_trait]
pub trait StorageFactory {
    async fn create(
        config: Config,
        path: StoragePath,
        cancellation_token: PipelineCancellationToken,
        stats_sender: Sender<SyncStatistics>,
        client_config: Option<ClientConfig>,
    ) -> Storage;
}

/// A bucket, or a local directory standing in for one.
///
/// Keys handed to and returned from a storage are always relative to its
/// configured prefix and always use `/` as the separator.
#[async_trait]
pub trait StorageTrait: DynClone {
    fn is_local_storage(&self) -> bool;

    /// Lists at most `max_keys` objects in ascending key order, starting
    /// strictly after `marker`. The returned page carries the marker for the
    /// next call, or `None` when the listing is exhausted.
    async fn list_objects_page(&self, marker: Option<String>, max_keys: i32)
        -> Result<ObjectPage>;
    async fn get_object(&self, key: &str) -> Result<GetObjectOutput>;
    async fn put_object(
        &self,
        key: &str,
        path: &Path,
        content_type: Option<String>,
        canned_acl: Option<ObjectCannedAcl>,
    ) -> Result<PutObjectOutput>;
    fn get_client(&self) -> Option<Arc<Client>>;
    fn get_stats_sender(&self) -> Sender<SyncStatistics>;
    async fn send_stats(&self, stats: SyncStatistics);
}
