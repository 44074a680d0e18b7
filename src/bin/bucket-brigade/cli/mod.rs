use anyhow::{Result, anyhow};
use tokio::time::Instant;
use tracing::{error, info, trace, warn};

use bucket_brigade::Config;
use bucket_brigade::pipeline::Pipeline;
use bucket_brigade::types::token::create_pipeline_cancellation_token;

mod ctrl_c_handler;
mod indicator;
mod ui_config;

/// Runs the sync. Objects that failed individually are logged and retried by
/// the next run, so only an aborted run is an error.
pub async fn run(config: Config) -> Result<()> {
    let cancellation_token = create_pipeline_cancellation_token();

    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = Instant::now();
    trace!("sync pipeline start.");

    let mut pipeline = Pipeline::new(config.clone(), cancellation_token).await;
    let indicator_join_handle = indicator::show_indicator(
        pipeline.get_stats_receiver(),
        ui_config::is_progress_indicator_needed(&config),
        ui_config::is_show_result_needed(&config),
        config.dry_run,
    );

    pipeline.run().await;
    indicator_join_handle.await?;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    if pipeline.has_error() {
        error!(
            duration_sec = duration_sec,
            "bucket-brigade failed. the run state has not been updated."
        );

        return Err(anyhow!("bucket-brigade failed."));
    }

    if pipeline.has_warning() {
        let failed_keys = pipeline.get_failed_keys();
        warn!(
            failed_objects = failed_keys.len(),
            duration_sec = duration_sec,
            "bucket-brigade has been completed with failed objects."
        );
    } else {
        info!(
            duration_sec = duration_sec,
            "bucket-brigade has been completed."
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use once_cell::sync::Lazy;
    use tokio::sync::Semaphore;

    use bucket_brigade::config::args::parse_from_args;

    use super::*;

    /// Serializes the tests that install a ctrl-c handler with the ones that
    /// send SIGINT to the test process.
    pub(super) static SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(1)));

    #[tokio::test]
    async fn run_pipeline_between_local_directories() {
        init_dummy_tracing_subscriber();

        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source_dir.path().join("dir1")).unwrap();
        std::fs::write(source_dir.path().join("dir1").join("a.jpg"), b"a").unwrap();

        let source = source_dir.path().to_string_lossy().to_string();
        let target = target_dir.path().to_string_lossy().to_string();
        let cache_dir = work_dir.path().join("cache").to_string_lossy().to_string();
        let run_state_file = work_dir.path().join("state").to_string_lossy().to_string();
        let args = vec![
            "bucket-brigade",
            "--allow-both-local-storage",
            "--cache-dir",
            cache_dir.as_str(),
            "--run-state-file",
            run_state_file.as_str(),
            source.as_str(),
            target.as_str(),
        ];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        run(config).await.unwrap();

        assert_eq!(
            std::fs::read(target_dir.path().join("dir1").join("a.jpg")).unwrap(),
            b"a"
        );
        assert!(work_dir.path().join("state").exists());
    }

    #[tokio::test]
    async fn run_completes_with_failed_objects() {
        init_dummy_tracing_subscriber();

        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let work_dir = tempfile::tempdir().unwrap();
        std::fs::write(source_dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::write(source_dir.path().join("broken.jpg"), b"b").unwrap();

        let source = source_dir.path().to_string_lossy().to_string();
        let target = target_dir.path().to_string_lossy().to_string();
        let cache_dir = work_dir.path().join("cache").to_string_lossy().to_string();
        let run_state_file = work_dir.path().join("state").to_string_lossy().to_string();
        let args = vec![
            "bucket-brigade",
            "--allow-both-local-storage",
            "--cache-dir",
            cache_dir.as_str(),
            "--run-state-file",
            run_state_file.as_str(),
            source.as_str(),
            target.as_str(),
            "--",
            "sh",
            "-c",
            r#"case "$1" in *broken*) exit 3;; esac; cp "$1" "$2""#,
            "sh",
            "{source}",
            "{destination}",
        ];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        assert!(run(config).await.is_ok());
        assert!(target_dir.path().join("a.jpg").exists());
        assert!(!target_dir.path().join("broken.jpg").exists());
        assert!(work_dir.path().join("state").exists());
        assert_eq!(
            std::fs::read_to_string(work_dir.path().join("state.failed")).unwrap(),
            "broken.jpg\n"
        );
    }

    #[tokio::test]
    async fn run_pipeline_error() {
        init_dummy_tracing_subscriber();

        let _semaphore = SEMAPHORE.clone().acquire_owned().await.unwrap();

        let work_dir = tempfile::tempdir().unwrap();
        let cache_dir = work_dir.path().join("cache").to_string_lossy().to_string();
        let run_state_file = work_dir.path().join("state").to_string_lossy().to_string();
        let args = vec![
            "bucket-brigade",
            "--source-profile",
            "source_profile",
            "--target-profile",
            "target_profile",
            "--aws-max-attempts",
            "1",
            "--source-endpoint-url",
            "https://invalid-s3-endpoint-url.6329313.local:65535",
            "--cache-dir",
            cache_dir.as_str(),
            "--run-state-file",
            run_state_file.as_str(),
            "s3://invalid_bucket",
            "s3://invalid_bucket2",
        ];
        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

        assert!(run(config).await.is_err());
        assert!(!work_dir.path().join("state").exists());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
