use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Error, Result};
use async_channel::{Receiver, Sender};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, trace};

use crate::pipeline::filter::ObjectFilterChain;
use crate::pipeline::lister::ObjectCatalog;
use crate::pipeline::stage::{SendResult, Stage};
use crate::pipeline::staging::StagingCache;
use crate::pipeline::syncer::ObjectSyncer;
use crate::run_state::{FileRunStateStore, RunStateStore};
use crate::storage::{Storage, StoragePair};
use crate::types::error::BucketBrigadeError;
use crate::types::token::PipelineCancellationToken;
use crate::types::SyncStatistics::{PageComplete, SyncSkip};
use crate::types::{ObjectRecord, SyncPhase, SyncStatistics};
use crate::Config;

pub mod downloader;
pub mod filter;
pub mod lister;
mod stage;
pub mod staging;
mod storage_factory;
mod syncer;
pub mod transformer;
pub mod uploader;

/// Incremental sync of one source into one target.
///
/// Pages are processed one at a time: the staging cache is cleared, the page
/// is listed, its candidates are handed to the workers, and the next page is
/// listed only after every worker has finished. The run state is recorded
/// only when the whole listing has been processed.
pub struct Pipeline {
    config: Config,
    source: Storage,
    target: Storage,
    run_state: Box<dyn RunStateStore>,
    staging: StagingCache,
    cancellation_token: PipelineCancellationToken,
    stats_receiver: Receiver<SyncStatistics>,
    has_error: Arc<AtomicBool>,
    has_warning: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<Error>>>,
    failed_keys: Arc<Mutex<HashSet<String>>>,
    phase: SyncPhase,
    ready: bool,
}

impl Pipeline {
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Self {
        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let StoragePair { source, target } = storage_factory::create_storage_pair(
            config.clone(),
            cancellation_token.clone(),
            stats_sender,
        )
        .await;

        let run_state = Box::new(FileRunStateStore::new(&config.run_state_file));
        let staging = StagingCache::new(&config.cache_dir);

        Self {
            config,
            source,
            target,
            run_state,
            staging,
            cancellation_token,
            stats_receiver,
            has_error: Arc::new(AtomicBool::new(false)),
            has_warning: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::<Error>::new())),
            failed_keys: Arc::new(Mutex::new(HashSet::new())),
            phase: SyncPhase::Init,
            ready: true,
        }
    }

    pub fn with_run_state_store(mut self, run_state: Box<dyn RunStateStore>) -> Self {
        self.run_state = run_state;
        self
    }

    pub async fn run(&mut self) {
        if !self.ready {
            panic!("it can be executed only once.")
        }
        self.ready = false;

        let run_started_at = Utc::now();

        if let Err(e) = self.sync(run_started_at).await {
            self.set_phase(SyncPhase::Aborted);
            log_error(
                self.has_error.clone(),
                self.errors.clone(),
                e,
                "sync has been aborted.",
            );
        }

        self.shutdown().await;
    }

    async fn shutdown(&self) {
        self.close_stats_sender();
    }

    async fn sync(&mut self, run_started_at: DateTime<Utc>) -> Result<()> {
        self.set_phase(SyncPhase::Init);

        let since = self.load_since().await?;
        let retry_keys = self.load_retry_keys().await?;

        let since_str = since.to_rfc3339();
        info!(
            since = since_str,
            retry_keys = retry_keys.len(),
            dry_run = self.config.dry_run,
            "sync has started."
        );

        let filters =
            ObjectFilterChain::from_config(&self.config.filter_config, since, retry_keys);
        let mut catalog =
            ObjectCatalog::new(dyn_clone::clone_box(&*self.source), self.config.page_size);

        loop {
            self.check_cancelled()?;

            self.clear_staging().await?;

            self.set_phase(SyncPhase::Listing);
            let Some(objects) = catalog
                .next_page()
                .await
                .context("failed to list source objects.")?
            else {
                break;
            };

            let listed = objects.len() as u64;
            let (candidates, skipped) = filters.partition(objects);
            for object in skipped {
                self.target
                    .send_stats(SyncSkip {
                        key: object.key().to_string(),
                    })
                    .await;
            }

            self.set_phase(SyncPhase::Syncing);
            self.sync_page(candidates).await?;
            self.check_cancelled()?;

            self.set_phase(SyncPhase::AdvancePage);
            self.target
                .send_stats(PageComplete { objects: listed })
                .await;
            trace!(cursor = catalog.cursor(), "page has been completed.");
        }

        self.set_phase(SyncPhase::Done);
        self.commit(run_started_at).await?;

        info!("sync has been completed.");

        Ok(())
    }

    async fn load_since(&self) -> Result<DateTime<Utc>> {
        if let Some(since) = self.config.since {
            debug!("--since is given. the stored run time is not used.");
            return Ok(since);
        }

        self.run_state.get_last_run_time().await
    }

    async fn load_retry_keys(&self) -> Result<HashSet<String>> {
        if !self.config.retry_failed_keys {
            return Ok(HashSet::new());
        }

        self.run_state.get_failed_keys().await
    }

    async fn clear_staging(&self) -> Result<()> {
        if self.config.dry_run {
            return Ok(());
        }

        self.staging.clear().await
    }

    async fn sync_page(&self, candidates: Vec<ObjectRecord>) -> Result<()> {
        if candidates.is_empty() {
            return Ok(());
        }

        let worker_size = usize::from(self.config.worker_size)
            .clamp(1, candidates.len());
        let (sender, receiver) = async_channel::bounded::<ObjectRecord>(candidates.len());

        let mut workers = Vec::with_capacity(worker_size);
        for worker_index in 0..worker_size {
            let object_syncer = ObjectSyncer::new(
                self.create_worker_stage(receiver.clone()),
                worker_index as u16,
                self.staging.clone(),
                self.failed_keys.clone(),
            );

            workers.push(tokio::spawn(async move { object_syncer.sync().await }));
        }
        drop(receiver);

        let feeder = self.create_feeder_stage(sender);
        for object in candidates {
            if feeder.send(object).await? == SendResult::Closed {
                break;
            }
        }
        // closing the channel lets the workers finish once it is drained.
        drop(feeder);

        let mut first_error = None;
        for worker in workers {
            match worker.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(anyhow!(e).context("sync worker has panicked."));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn commit(&self, run_started_at: DateTime<Utc>) -> Result<()> {
        if self.config.dry_run {
            info!("[dry-run] run state is not recorded.");
            return Ok(());
        }

        self.staging.clear().await?;

        let failed_keys = self.failed_keys.lock().unwrap().clone();
        self.run_state.record_failed_keys(&failed_keys).await?;
        self.run_state.record_run_time(&run_started_at).await
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(anyhow!(BucketBrigadeError::Cancelled));
        }

        Ok(())
    }

    fn set_phase(&mut self, phase: SyncPhase) {
        trace!(phase = ?phase, "sync phase has changed.");
        self.phase = phase;
    }

    fn create_worker_stage(&self, receiver: Receiver<ObjectRecord>) -> Stage {
        Stage::new(
            self.config.clone(),
            Some(dyn_clone::clone_box(&*self.source)),
            Some(dyn_clone::clone_box(&*self.target)),
            Some(receiver),
            None,
            self.cancellation_token.clone(),
            self.has_warning.clone(),
        )
    }

    fn create_feeder_stage(&self, sender: Sender<ObjectRecord>) -> Stage {
        Stage::new(
            self.config.clone(),
            None,
            None,
            None,
            Some(sender),
            self.cancellation_token.clone(),
            self.has_warning.clone(),
        )
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn get_failed_keys(&self) -> HashSet<String> {
        self.failed_keys.lock().unwrap().clone()
    }

    pub fn get_stats_receiver(&self) -> Receiver<SyncStatistics> {
        self.stats_receiver.clone()
    }

    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    pub fn has_warning(&self) -> bool {
        self.has_warning.load(Ordering::SeqCst)
    }

    pub fn get_errors_and_consume(&self) -> Option<Vec<Error>> {
        if !self.has_error() {
            return None;
        }

        let error_list = self.errors.clone();
        let mut error_list = error_list.lock().unwrap();

        Some(error_list.drain(..).collect())
    }

    pub fn close_stats_sender(&self) {
        self.source.get_stats_sender().close();
        self.target.get_stats_sender().close();
    }
}

fn log_error(
    has_error: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<Error>>>,
    e: Error,
    message: &str,
) {
    has_error.store(true, Ordering::SeqCst);

    let error = e.to_string();
    let source = e.source();

    error!(error = error, source = source, message);

    let mut error_list = errors.lock().unwrap();
    error_list.push_back(e);
}
