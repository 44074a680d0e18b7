use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::storage::local::fs_util;
use crate::types::error::BucketBrigadeError;

const FAILED_KEYS_SUFFIX: &str = ".failed";

// newline separated, so line breaks and the escape character itself are encoded.
const FAILED_KEY_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'%');

/// Persistence of the run window between invocations.
#[async_trait]
pub trait RunStateStore: Send + Sync {
    /// The start time of the last completed run, or the Unix epoch when no run
    /// has completed yet.
    async fn get_last_run_time(&self) -> Result<DateTime<Utc>>;
    async fn record_run_time(&self, run_started_at: &DateTime<Utc>) -> Result<()>;
    async fn get_failed_keys(&self) -> Result<HashSet<String>>;
    async fn record_failed_keys(&self, keys: &HashSet<String>) -> Result<()>;
}

/// Stores the run time as decimal epoch milliseconds in a single file, and the
/// failed keys of the last completed run in a sidecar file next to it.
pub struct FileRunStateStore {
    path: PathBuf,
}

impl FileRunStateStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn failed_keys_path(&self) -> PathBuf {
        let mut path = self.path.as_os_str().to_owned();
        path.push(FAILED_KEYS_SUFFIX);
        PathBuf::from(path)
    }

    async fn read_optional(path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!(e).context(format!(
                "failed to read run state: {}",
                path.to_string_lossy()
            ))),
        }
    }
}

#[async_trait]
impl RunStateStore for FileRunStateStore {
    async fn get_last_run_time(&self) -> Result<DateTime<Utc>> {
        let Some(content) = Self::read_optional(&self.path).await? else {
            debug!("no run state found. all objects are candidates.");
            return Ok(DateTime::<Utc>::UNIX_EPOCH);
        };

        let last_run_time = parse_run_time(&content)?;

        let last_run = last_run_time.to_rfc3339();
        debug!(last_run = last_run, "run state loaded.");

        Ok(last_run_time)
    }

    async fn record_run_time(&self, run_started_at: &DateTime<Utc>) -> Result<()> {
        write_atomically(
            &self.path,
            run_started_at.timestamp_millis().to_string().as_bytes(),
        )
        .await?;

        let run_started_at = run_started_at.to_rfc3339();
        info!(run_started_at = run_started_at, "run state recorded.");

        Ok(())
    }

    async fn get_failed_keys(&self) -> Result<HashSet<String>> {
        let Some(content) = Self::read_optional(&self.failed_keys_path()).await? else {
            return Ok(HashSet::new());
        };

        content
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                percent_decode_str(line)
                    .decode_utf8()
                    .map(|key| key.to_string())
                    .map_err(|_| anyhow!(BucketBrigadeError::InvalidRunState(line.to_string())))
            })
            .collect()
    }

    async fn record_failed_keys(&self, keys: &HashSet<String>) -> Result<()> {
        let failed_keys_path = self.failed_keys_path();

        if keys.is_empty() {
            return match tokio::fs::remove_file(&failed_keys_path).await {
                Err(e) if e.kind() != io::ErrorKind::NotFound => {
                    Err(anyhow!(e).context("tokio::fs::remove_file() failed."))
                }
                _ => Ok(()),
            };
        }

        let mut sorted_keys: Vec<&String> = keys.iter().collect();
        sorted_keys.sort();

        let content: String = sorted_keys
            .into_iter()
            .map(|key| format!("{}\n", utf8_percent_encode(key, FAILED_KEY_ENCODE_SET)))
            .collect();
        write_atomically(&failed_keys_path, content.as_bytes()).await?;

        info!(count = keys.len(), "failed keys recorded for the next run.");

        Ok(())
    }
}

fn parse_run_time(content: &str) -> Result<DateTime<Utc>> {
    let trimmed = content.trim();
    let invalid = || anyhow!(BucketBrigadeError::InvalidRunState(trimmed.to_string()));

    let millis = trimmed.parse::<i64>().map_err(|_| invalid())?;
    DateTime::from_timestamp_millis(millis).ok_or_else(invalid)
}

async fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let temp_file = fs_util::create_temp_file_for(path).await?;

    let mut file = tokio::fs::File::from_std(
        temp_file
            .as_file()
            .try_clone()
            .context("std::fs::File::try_clone() failed.")?,
    );
    file.write_all(content)
        .await
        .context("tokio::fs::File::write_all() failed.")?;
    file.sync_all()
        .await
        .context("tokio::fs::File::sync_all() failed.")?;
    drop(file);

    temp_file
        .persist(path)
        .context("NamedTempFile::persist() failed.")?;

    Ok(())
}
