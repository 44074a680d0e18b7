#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use filetime::{FileTime, set_file_mtime};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use bucket_brigade::Config;
use bucket_brigade::config::args::parse_from_args;
use bucket_brigade::pipeline::Pipeline;
use bucket_brigade::types::SyncStatistics;
use bucket_brigade::types::token::{PipelineCancellationToken, create_pipeline_cancellation_token};

pub static SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(1)));

/// Exits non-zero for staged files whose name contains "broken".
pub const FAIL_ON_BROKEN_SCRIPT: &str = r#"case "$1" in *broken*) exit 3;; esac; cp "$1" "$2""#;

/// Transform arguments that run `script` with the staged paths as `$1` and `$2`.
pub fn sh_transform(script: &str) -> Vec<&str> {
    vec!["sh", "-c", script, "sh", "{source}", "{destination}"]
}

pub struct TestHelper {
    source_dir: TempDir,
    target_dir: TempDir,
    work_dir: TempDir,
}

impl TestHelper {
    pub fn new() -> Self {
        Self {
            source_dir: tempfile::tempdir().unwrap(),
            target_dir: tempfile::tempdir().unwrap(),
            work_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn source(&self) -> &Path {
        self.source_dir.path()
    }

    pub fn target(&self) -> &Path {
        self.target_dir.path()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.work_dir.path().join("cache")
    }

    pub fn run_state_file(&self) -> PathBuf {
        self.work_dir.path().join("last-run")
    }

    pub fn failed_keys_file(&self) -> PathBuf {
        self.work_dir.path().join("last-run.failed")
    }

    /// Writes a source object whose last modified time is `age` before now.
    pub fn put_source_object(&self, key: &str, content: &[u8], age: Duration) {
        let path = self.source().join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        touch(&path, Utc::now() - age);
    }

    pub fn touch_source_object(&self, key: &str, last_modified: DateTime<Utc>) {
        touch(&self.source().join(key), last_modified);
    }

    pub fn read_target_object(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.target().join(key)).ok()
    }

    /// Returns the target objects keyed by their relative path.
    pub fn list_target_objects(&self) -> BTreeMap<String, Vec<u8>> {
        WalkDir::new(self.target())
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let key = entry
                    .path()
                    .strip_prefix(self.target())
                    .unwrap()
                    .to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "/");
                (key, std::fs::read(entry.path()).unwrap())
            })
            .collect()
    }

    pub fn write_run_state(&self, last_run: DateTime<Utc>) {
        std::fs::write(
            self.run_state_file(),
            last_run.timestamp_millis().to_string(),
        )
        .unwrap();
    }

    pub fn read_run_state(&self) -> Option<DateTime<Utc>> {
        let content = std::fs::read_to_string(self.run_state_file()).ok()?;
        DateTime::from_timestamp_millis(content.trim().parse().unwrap())
    }

    pub fn read_failed_keys(&self) -> Vec<String> {
        std::fs::read_to_string(self.failed_keys_file())
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Builds a config for a local to local sync. `extra_args` go before the
    /// storage paths, and `transform` after `--` when it is not empty.
    pub fn build_config(&self, extra_args: &[&str], transform: &[&str]) -> Config {
        let source = self.source().to_string_lossy().to_string();
        let target = self.target().to_string_lossy().to_string();
        let cache_dir = self.cache_dir().to_string_lossy().to_string();
        let run_state_file = self.run_state_file().to_string_lossy().to_string();

        let mut args = vec![
            "bucket-brigade",
            "--allow-both-local-storage",
            "--cache-dir",
            cache_dir.as_str(),
            "--run-state-file",
            run_state_file.as_str(),
        ];
        args.extend_from_slice(extra_args);
        args.push(source.as_str());
        args.push(target.as_str());
        if !transform.is_empty() {
            args.push("--");
            args.extend_from_slice(transform);
        }

        Config::try_from(parse_from_args(args).unwrap()).unwrap()
    }

    pub async fn run(&self, config: Config) -> SyncResult {
        self.run_with_token(config, create_pipeline_cancellation_token())
            .await
    }

    pub async fn run_with_token(
        &self,
        config: Config,
        cancellation_token: PipelineCancellationToken,
    ) -> SyncResult {
        let mut pipeline = Pipeline::new(config, cancellation_token).await;
        let stats_receiver = pipeline.get_stats_receiver();

        pipeline.run().await;

        let mut stats = Vec::new();
        while let Ok(sync_stats) = stats_receiver.try_recv() {
            stats.push(sync_stats);
        }

        let mut failed_keys: Vec<String> = pipeline.get_failed_keys().into_iter().collect();
        failed_keys.sort();

        SyncResult {
            has_error: pipeline.has_error(),
            has_warning: pipeline.has_warning(),
            failed_keys,
            stats,
        }
    }

    pub fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}

pub struct SyncResult {
    pub has_error: bool,
    pub has_warning: bool,
    pub failed_keys: Vec<String>,
    pub stats: Vec<SyncStatistics>,
}

impl SyncResult {
    pub fn synced_keys(&self) -> Vec<String> {
        self.keys_of(|stats| match stats {
            SyncStatistics::SyncComplete { key } => Some(key),
            _ => None,
        })
    }

    pub fn skipped_keys(&self) -> Vec<String> {
        self.keys_of(|stats| match stats {
            SyncStatistics::SyncSkip { key } => Some(key),
            _ => None,
        })
    }

    pub fn page_count(&self) -> usize {
        self.stats
            .iter()
            .filter(|stats| matches!(stats, SyncStatistics::PageComplete { .. }))
            .count()
    }

    fn keys_of(&self, key: impl Fn(&SyncStatistics) -> Option<&String>) -> Vec<String> {
        let mut keys: Vec<String> = self.stats.iter().filter_map(key).cloned().collect();
        keys.sort();
        keys
    }
}

fn touch(path: &Path, last_modified: DateTime<Utc>) {
    set_file_mtime(
        path,
        FileTime::from_unix_time(
            last_modified.timestamp(),
            last_modified.timestamp_subsec_nanos(),
        ),
    )
    .unwrap();
}
