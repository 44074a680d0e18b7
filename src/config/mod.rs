use std::path::PathBuf;

use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::{DateTime, Utc};
use fancy_regex::Regex;

use crate::types::transform_command::TransformCommand;
use crate::types::{ClientConfigLocation, S3Credentials, StoragePath};

pub mod args;

#[derive(Debug, Clone)]
pub struct Config {
    pub source: StoragePath,
    pub target: StoragePath,
    pub source_client_config: Option<ClientConfig>,
    pub target_client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub worker_size: u16,
    pub page_size: i32,
    pub dry_run: bool,
    pub show_no_progress: bool,
    pub cache_dir: PathBuf,
    pub run_state_file: PathBuf,
    pub since: Option<DateTime<Utc>>,
    pub retry_failed_keys: bool,
    pub filter_config: FilterConfig,
    pub transform_config: TransformConfig,
    pub upload_config: UploadConfig,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub disable_stalled_stream_protection: bool,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

#[derive(Debug, Clone)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub extension: String,
    pub include_regex: Option<Regex>,
    pub exclude_regex: Option<Regex>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extension: ".jpg".to_string(),
            include_regex: None,
            exclude_regex: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformConfig {
    pub command: TransformCommand,
    pub timeout_milliseconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub canned_acl: Option<ObjectCannedAcl>,
    pub content_type: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            canned_acl: Some(ObjectCannedAcl::PublicRead),
            content_type: None,
        }
    }
}

impl UploadConfig {
    /// Explicit content type first, then the fixed `image/jpg` classification
    /// for the jpeg family, then a guess from the extension.
    pub fn content_type_for(&self, key: &str) -> String {
        if let Some(content_type) = &self.content_type {
            return content_type.clone();
        }

        let lower_key = key.to_ascii_lowercase();
        if lower_key.ends_with(".jpg") || lower_key.ends_with(".jpeg") {
            return "image/jpg".to_string();
        }

        mime_guess::from_path(key)
            .first_or_octet_stream()
            .to_string()
    }
}
