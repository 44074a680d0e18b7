use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use aws_smithy_types::body::SdkBody;
use tracing::{error, info, trace, warn};

use crate::pipeline::downloader::Downloader;
use crate::pipeline::staging::StagingCache;
use crate::pipeline::transformer::Transformer;
use crate::pipeline::uploader::Uploader;
use crate::types::error::{is_fatal_error, BucketBrigadeError};
use crate::types::SyncStatistics::{SyncComplete, SyncError, SyncWarning, TransformComplete};
use crate::types::{ObjectRecord, StagingRole};

use super::stage::Stage;

/// One worker of a page. Receives candidates and runs download, transform and
/// upload for each of them in order.
///
/// A failure of one object is logged, recorded in `failed_keys` and does not
/// stop the worker. Only fatal errors end the worker with an error, after
/// cancelling the whole pipeline.
pub struct ObjectSyncer {
    worker_index: u16,
    base: Stage,
    staging: StagingCache,
    failed_keys: Arc<Mutex<HashSet<String>>>,
}

impl ObjectSyncer {
    pub fn new(
        base: Stage,
        worker_index: u16,
        staging: StagingCache,
        failed_keys: Arc<Mutex<HashSet<String>>>,
    ) -> Self {
        Self {
            worker_index,
            base,
            staging,
            failed_keys,
        }
    }

    pub async fn sync(&self) -> Result<()> {
        trace!(worker_index = self.worker_index, "sync worker has started.");
        self.receive_and_sync().await
    }

    async fn receive_and_sync(&self) -> Result<()> {
        loop {
            tokio::select! {
                recv_result = self.base.receiver.as_ref().unwrap().recv() => {
                    match recv_result {
                        Ok(object) => {
                            if self.base.cancellation_token.is_cancelled() {
                                info!(worker_index = self.worker_index, "sync worker has been cancelled.");
                                return Ok(());
                            }

                            if let Err(e) = self.sync_object_with_isolation(object).await {
                                self.base.cancellation_token.cancel();
                                error!(worker_index = self.worker_index, "sync worker has been cancelled with error.");
                                return Err(e);
                            }
                        },
                        Err(_) => {
                            // normal shutdown
                            trace!(worker_index = self.worker_index, "sync worker has been completed.");
                            break;
                        }
                    }
                },
                _ = self.base.cancellation_token.cancelled() => {
                    info!(worker_index = self.worker_index, "sync worker has been cancelled.");
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    async fn sync_object_with_isolation(&self, object: ObjectRecord) -> Result<()> {
        let key = object.key();

        let result = if self.base.config.dry_run {
            self.simulate_sync_object(&object).await
        } else {
            self.sync_object(&object).await
        };

        let Err(e) = result else {
            return Ok(());
        };

        let error = e.to_string();

        if is_fatal_error(&e) {
            self.base
                .send_stats(SyncError {
                    key: key.to_string(),
                })
                .await;
            error!(
                worker_index = self.worker_index,
                key = key,
                error = error,
                source = e.source(),
                "fatal error has occurred."
            );

            return Err(e);
        }

        self.base.set_warning();

        // unsafe keys are not retried
        if is_unsafe_key_error(&e) {
            self.base
                .send_stats(SyncWarning {
                    key: key.to_string(),
                })
                .await;
            warn!(
                worker_index = self.worker_index,
                key = key,
                error = error,
                "object cannot be staged. skipping."
            );

            return Ok(());
        }

        self.record_failed_key(key);

        if is_not_found_error(&e) {
            self.base
                .send_stats(SyncWarning {
                    key: key.to_string(),
                })
                .await;
            warn!(
                worker_index = self.worker_index,
                key = key,
                error = error,
                source = e.source(),
                "object not found. skipping."
            );

            return Ok(());
        }

        if is_access_denied_error(&e) {
            self.base
                .send_stats(SyncWarning {
                    key: key.to_string(),
                })
                .await;
            warn!(
                worker_index = self.worker_index,
                key = key,
                error = error,
                source = e.source(),
                "access denied. skipping."
            );

            return Ok(());
        }

        self.base
            .send_stats(SyncError {
                key: key.to_string(),
            })
            .await;
        error!(
            worker_index = self.worker_index,
            key = key,
            error = error,
            source = e.source(),
            "sync failed. skipping."
        );

        Ok(())
    }

    async fn sync_object(&self, object: &ObjectRecord) -> Result<()> {
        let key = object.key();

        let original = self.downloader().fetch(object).await?;

        let destination = self
            .staging
            .path_for(StagingRole::Transformed, key)
            .await?;
        let transformed = self.transformer().run(&original, &destination).await?;
        self.base
            .send_stats(TransformComplete {
                key: key.to_string(),
            })
            .await;

        self.uploader().push(key, &transformed).await?;

        self.base
            .send_stats(SyncComplete {
                key: key.to_string(),
            })
            .await;

        info!(
            worker_index = self.worker_index,
            key = key,
            size = object.size(),
            "sync completed."
        );

        Ok(())
    }

    async fn simulate_sync_object(&self, object: &ObjectRecord) -> Result<()> {
        let key = object.key();
        let last_modified = object.last_modified().to_rfc3339();

        self.base
            .send_stats(SyncComplete {
                key: key.to_string(),
            })
            .await;

        info!(
            worker_index = self.worker_index,
            key = key,
            size = object.size(),
            last_modified = last_modified,
            "[dry-run] sync completed."
        );

        Ok(())
    }

    fn record_failed_key(&self, key: &str) {
        self.failed_keys.lock().unwrap().insert(key.to_string());
    }

    fn downloader(&self) -> Downloader {
        Downloader::new(
            dyn_clone::clone_box(&*(*self.base.source.as_ref().unwrap())),
            self.staging.clone(),
        )
    }

    fn transformer(&self) -> Transformer {
        Transformer::new(self.base.config.transform_config.clone())
    }

    fn uploader(&self) -> Uploader {
        Uploader::new(
            dyn_clone::clone_box(&*(*self.base.target.as_ref().unwrap())),
            self.base.config.upload_config.clone(),
        )
    }
}

fn is_not_found_error(result: &Error) -> bool {
    if let Some(SdkError::ServiceError(e)) =
        result.downcast_ref::<SdkError<GetObjectError, Response<SdkBody>>>()
    {
        if e.err().is_no_such_key() {
            return true;
        }
    }

    false
}

fn is_access_denied_error(result: &Error) -> bool {
    if let Some(SdkError::ServiceError(e)) =
        result.downcast_ref::<SdkError<GetObjectError, Response<SdkBody>>>()
    {
        if let Some(code) = e.err().meta().code() {
            return code == "AccessDenied";
        }
    }

    if let Some(SdkError::ServiceError(e)) =
        result.downcast_ref::<SdkError<PutObjectError, Response<SdkBody>>>()
    {
        if let Some(code) = e.err().meta().code() {
            return code == "AccessDenied";
        }
    }

    false
}

fn is_unsafe_key_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<BucketBrigadeError>(),
        Some(BucketBrigadeError::DirectoryTraversalError)
            | Some(BucketBrigadeError::DirectoryKeyError(_))
    )
}
