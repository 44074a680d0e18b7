use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_channel::{Receiver, Sender};

use crate::storage::Storage;
use crate::types::token::PipelineCancellationToken;
use crate::types::{ObjectRecord, SyncStatistics};
use crate::Config;

pub struct Stage {
    pub config: Config,
    pub source: Option<Storage>,
    pub target: Option<Storage>,
    pub receiver: Option<Receiver<ObjectRecord>>,
    pub sender: Option<Sender<ObjectRecord>>,
    pub cancellation_token: PipelineCancellationToken,
    pub has_warning: Arc<AtomicBool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Success,
    Closed,
}

impl Stage {
    pub fn new(
        config: Config,
        source: Option<Storage>,
        target: Option<Storage>,
        receiver: Option<Receiver<ObjectRecord>>,
        sender: Option<Sender<ObjectRecord>>,
        cancellation_token: PipelineCancellationToken,
        has_warning: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            receiver,
            sender,
            cancellation_token,
            has_warning,
        }
    }

    pub async fn send(&self, object: ObjectRecord) -> Result<SendResult> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("stage has no sender."))?;

        let result = sender
            .send(object)
            .await
            .context("async_channel::Sender::send() failed.");

        if let Err(e) = result {
            return if !sender.is_closed() {
                Err(e)
            } else {
                Ok(SendResult::Closed)
            };
        }

        Ok(SendResult::Success)
    }

    pub async fn send_stats(&self, stats: SyncStatistics) {
        if let Some(target) = self.target.as_ref() {
            target.send_stats(stats).await;
        }
    }

    pub fn set_warning(&self) {
        self.has_warning.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::config::args::parse_from_args;
    use crate::types::token::create_pipeline_cancellation_token;

    use super::*;

    fn build_stage(
        receiver: Option<Receiver<ObjectRecord>>,
        sender: Option<Sender<ObjectRecord>>,
    ) -> Stage {
        let args = vec!["bucket-brigade", "s3://source-bucket", "s3://target-bucket"];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        Stage::new(
            config,
            None,
            None,
            receiver,
            sender,
            create_pipeline_cancellation_token(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[tokio::test]
    async fn send_success() {
        init_dummy_tracing_subscriber();

        let (sender, receiver) = async_channel::bounded(1);
        let stage = build_stage(None, Some(sender));

        let result = stage
            .send(ObjectRecord::new("a.jpg", Utc::now(), 1))
            .await
            .unwrap();

        assert_eq!(result, SendResult::Success);
        assert_eq!(receiver.recv().await.unwrap().key(), "a.jpg");
    }

    #[tokio::test]
    async fn send_to_closed_channel() {
        init_dummy_tracing_subscriber();

        let (sender, receiver) = async_channel::bounded(1);
        receiver.close();
        let stage = build_stage(None, Some(sender));

        let result = stage
            .send(ObjectRecord::new("a.jpg", Utc::now(), 1))
            .await
            .unwrap();

        assert_eq!(result, SendResult::Closed);
    }

    #[tokio::test]
    async fn send_without_sender() {
        init_dummy_tracing_subscriber();

        let stage = build_stage(None, None);

        assert!(stage
            .send(ObjectRecord::new("a.jpg", Utc::now(), 1))
            .await
            .is_err());
    }

    #[test]
    fn set_warning() {
        init_dummy_tracing_subscriber();

        let stage = build_stage(None, None);
        stage.set_warning();

        assert!(stage.has_warning.load(Ordering::SeqCst));
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
