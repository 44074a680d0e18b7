use async_channel::Sender;

use crate::Config;
use crate::config::ClientConfig;
use crate::storage::local::LocalStorageFactory;
use crate::storage::s3::S3StorageFactory;
use crate::storage::{Storage, StorageFactory, StoragePair};
use crate::types::token::PipelineCancellationToken;
use crate::types::{StoragePath, SyncStatistics};

pub async fn create_storage_pair(
    config: Config,
    cancellation_token: PipelineCancellationToken,
    stats_sender: Sender<SyncStatistics>,
) -> StoragePair {
    let source = create_storage(
        config.clone(),
        config.source_client_config.clone(),
        config.source.clone(),
        cancellation_token.clone(),
        stats_sender.clone(),
    )
    .await;

    let target = create_storage(
        config.clone(),
        config.target_client_config.clone(),
        config.target.clone(),
        cancellation_token,
        stats_sender,
    )
    .await;

    StoragePair { source, target }
}

async fn create_storage(
    config: Config,
    client_config: Option<ClientConfig>,
    storage_path: StoragePath,
    cancellation_token: PipelineCancellationToken,
    stats_sender: Sender<SyncStatistics>,
) -> Storage {
    let factory_fn = match storage_path {
        StoragePath::S3 { .. } => S3StorageFactory::create,
        StoragePath::Local(_) => LocalStorageFactory::create,
    };

    factory_fn(
        config,
        storage_path,
        cancellation_token,
        stats_sender,
        client_config,
    )
    .await
}
