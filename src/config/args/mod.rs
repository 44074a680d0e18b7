use crate::Config;
use crate::config::args::value_parser::{
    canned_acl, regex, storage_path, transform_command, url,
};
use crate::config::{
    CLITimeoutConfig, ClientConfig, FilterConfig, RetryConfig, TracingConfig, TransformConfig,
    UploadConfig,
};
use crate::types::transform_command::{DEFAULT_TRANSFORM_COMMAND, TransformCommand};
use crate::types::{AccessKeys, ClientConfigLocation, S3Credentials, StoragePath};
use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::{DateTime, Utc};
use clap::Parser;
use clap::builder::{ArgPredicate, NonEmptyStringValueParser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use fancy_regex::Regex;
#[cfg(feature = "version")]
use shadow_rs::shadow;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

mod tests;
mod value_parser;

const DEFAULT_WORKER_SIZE: u16 = 1;
const DEFAULT_PAGE_SIZE: i32 = 5;
const DEFAULT_CACHE_DIR: &str = ".bucket-brigade-cache";
const DEFAULT_RUN_STATE_FILE: &str = ".last-run";
const DEFAULT_FILTER_EXTENSION: &str = ".jpg";
const DEFAULT_ACL: &str = "public-read";
const DEFAULT_DISABLE_ACL: bool = false;
const DEFAULT_DISABLE_FAILED_KEY_RETRY: bool = false;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_SHOW_NO_PROGRESS: bool = false;
const DEFAULT_DISABLE_STALLED_STREAM_PROTECTION: bool = false;

const NO_S3_STORAGE_SPECIFIED: &str = "either SOURCE or TARGET must be s3://\n";
const SOURCE_LOCAL_STORAGE_DIR_NOT_FOUND: &str = "directory must be specified as a source\n";
const TARGET_LOCAL_STORAGE_INVALID: &str = "invalid target path\n";
const SOURCE_LOCAL_STORAGE_SPECIFIED_WITH_ENDPOINT_URL: &str =
    "with --source-endpoint-url, source storage must be s3://\n";
const TARGET_LOCAL_STORAGE_SPECIFIED_WITH_ENDPOINT_URL: &str =
    "with --target-endpoint-url, target storage must be s3://\n";
const NO_SOURCE_CREDENTIAL_REQUIRED: &str = "no source credential required\n";
const NO_TARGET_CREDENTIAL_REQUIRED: &str = "no target credential required\n";
const CACHE_DIR_INSIDE_SOURCE: &str =
    "--cache-dir must not be inside the source directory\n";
const RUN_STATE_FILE_IS_DIRECTORY: &str = "--run-state-file must not be a directory\n";
const INVALID_CACHE_DIR: &str = "invalid --cache-dir\n";

#[cfg(feature = "version")]
shadow!(build);

#[derive(Parser, Clone, Debug)]
#[cfg_attr(feature = "version", command(version=format!("{} ({} {}), {}", build::PKG_VERSION, build::SHORT_COMMIT, build::BUILD_TARGET, build::RUST_VERSION)))]
pub struct CLIArgs {
    #[arg(env, help = "s3://<BUCKET_NAME>[/prefix] or local path", value_parser = storage_path::check_storage_path, default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "s3://ignored"), required = false)]
    source: String,

    #[arg(env, help = "s3://<BUCKET_NAME>[/prefix] or local path", value_parser = storage_path::check_storage_path, default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "s3://ignored"), required = false)]
    target: String,

    /// transform program and arguments, given after `--`. overrides --transform-command.
    /// e.g. -- magick {source} -resize 50% {destination}
    #[arg(last = true, value_name = "TRANSFORM_ARGS")]
    transform_args: Vec<String>,

    /// A simulation mode. lists candidates, but downloads, transforms and uploads nothing
    #[arg(long, env, default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    dry_run: bool,

    /// don't show the progress bar
    #[arg(long, env, default_value_t = DEFAULT_SHOW_NO_PROGRESS, help_heading = "General")]
    show_no_progress: bool,

    /// local working directory for downloaded and transformed files. cleared on every page
    #[arg(long, env, default_value = DEFAULT_CACHE_DIR, value_name = "DIR", help_heading = "General")]
    cache_dir: PathBuf,

    /// file that stores the start time of the last completed run
    #[arg(long, env, default_value = DEFAULT_RUN_STATE_FILE, value_name = "FILE", help_heading = "General")]
    run_state_file: PathBuf,

    /// process objects modified at or after the given time instead of the last run time (RFC3339 datetime such as 2024-02-19T12:00:00Z)
    #[arg(long, env, help_heading = "General")]
    since: Option<DateTime<Utc>>,

    /// do not retry the objects that failed in the previous run
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_FAILED_KEY_RETRY, help_heading = "General")]
    disable_failed_key_retry: bool,

    /// location of the file that the AWS CLI uses to store configuration profiles
    #[arg(long, env, value_name = "FILE", help_heading = "AWS Configuration")]
    aws_config_file: Option<PathBuf>,

    /// location of the file that the AWS CLI uses to store access keys
    #[arg(long, env, value_name = "FILE", help_heading = "AWS Configuration")]
    aws_shared_credentials_file: Option<PathBuf>,

    /// source AWS CLI profile
    #[arg(long, env, conflicts_with_all = ["source_access_key", "source_secret_access_key", "source_session_token"], help_heading = "AWS Configuration")]
    source_profile: Option<String>,

    /// source access key
    #[arg(long, env, conflicts_with_all = ["source_profile"], requires = "source_secret_access_key", help_heading = "AWS Configuration")]
    source_access_key: Option<String>,

    /// source secret access key
    #[arg(long, env, conflicts_with_all = ["source_profile"], requires = "source_access_key", help_heading = "AWS Configuration")]
    source_secret_access_key: Option<String>,

    /// source session token
    #[arg(long, env, conflicts_with_all = ["source_profile"], requires = "source_access_key", help_heading = "AWS Configuration")]
    source_session_token: Option<String>,

    /// target AWS CLI profile
    #[arg(long, env, conflicts_with_all = ["target_access_key", "target_secret_access_key", "target_session_token"], help_heading = "AWS Configuration")]
    target_profile: Option<String>,

    /// target access key
    #[arg(long, env, conflicts_with_all = ["target_profile"], requires = "target_secret_access_key", help_heading = "AWS Configuration")]
    target_access_key: Option<String>,

    /// target secret access key
    #[arg(long, env, conflicts_with_all = ["target_profile"], requires = "target_access_key", help_heading = "AWS Configuration")]
    target_secret_access_key: Option<String>,

    /// target session token
    #[arg(long, env, conflicts_with_all = ["target_profile"], requires = "target_access_key", help_heading = "AWS Configuration")]
    target_session_token: Option<String>,

    /// source region
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Source Options")]
    source_region: Option<String>,

    /// source endpoint url
    #[arg(long, env, value_parser = url::check_scheme, help_heading = "Source Options")]
    source_endpoint_url: Option<String>,

    /// force path-style addressing for source endpoint
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "Source Options")]
    source_force_path_style: bool,

    /// target region
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Target Options")]
    target_region: Option<String>,

    /// target endpoint url
    #[arg(long, env, value_parser = url::check_scheme, help_heading = "Target Options")]
    target_endpoint_url: Option<String>,

    /// force path-style addressing for target endpoint
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "Target Options")]
    target_force_path_style: bool,

    /// process only keys that end with the given extension. an empty value matches every key
    #[arg(long, env, default_value = DEFAULT_FILTER_EXTENSION, help_heading = "Filtering")]
    filter_extension: String,

    /// process only objects that match given regular expression
    #[arg(long, env, value_parser = regex::parse_regex, help_heading = "Filtering")]
    filter_include_regex: Option<Regex>,

    /// do not process objects that match given regular expression
    #[arg(long, env, value_parser = regex::parse_regex, help_heading = "Filtering")]
    filter_exclude_regex: Option<Regex>,

    /// transform command template. {source} and {destination} are replaced with the staged file paths.
    /// executed without a shell
    #[arg(long, env, default_value = DEFAULT_TRANSFORM_COMMAND, value_parser = transform_command::parse_transform_command, help_heading = "Transform")]
    transform_command: TransformCommand,

    /// kill the transform command if it runs longer than the given milliseconds
    #[arg(long, env, value_parser = clap::value_parser!(u64).range(1..), help_heading = "Transform")]
    transform_timeout_milliseconds: Option<u64>,

    /// ACL for the uploaded objects
    /// valid choices: private | public-read | public-read-write | authenticated-read | aws-exec-read | bucket-owner-read | bucket-owner-full-control
    #[arg(long, env, default_value = DEFAULT_ACL, value_parser = canned_acl::parse_canned_acl, help_heading = "Upload")]
    acl: ObjectCannedAcl,

    /// do not send an ACL with uploads. required for buckets with ACLs disabled
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_ACL, help_heading = "Upload")]
    disable_acl: bool,

    /// Content-Type to set on the uploaded objects. by default, image/jpg for jpeg files and guessed from the key otherwise
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Upload")]
    content_type: Option<String>,

    /// number of objects of a page processed in parallel
    #[arg(long, env, default_value_t = DEFAULT_WORKER_SIZE, value_parser = clap::value_parser!(u16).range(1..), help_heading = "Performance")]
    worker_size: u16,

    /// maximum number of objects returned in a single list object request
    #[arg(long, env, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(i32).range(1..=1000), help_heading = "Performance")]
    page_size: i32,

    /// trace verbosity(-v: show info, -vv: show debug, -vvv show trace)
    #[clap(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// show trace as json format
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Tracing/Logging")]
    json_tracing: bool,

    /// enable aws sdk tracing
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Tracing/Logging")]
    aws_sdk_tracing: bool,

    /// show span event tracing
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Tracing/Logging")]
    span_events_tracing: bool,

    /// disable ANSI terminal colors
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Tracing/Logging")]
    disable_color_tracing: bool,

    /// maximum retry attempts of a single aws sdk request
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, value_name = "max_attempts", help_heading = "Retry Options")]
    aws_max_attempts: u32,

    /// a multiplier value used when calculating backoff times as part of an exponential backoff with jitter strategy.
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, value_name = "initial_backoff", help_heading = "Retry Options")]
    initial_backoff_milliseconds: u64,

    /// operation timeout (milliseconds). For details, see the AWS SDK for Rust TimeoutConfig documentation.
    /// The default has no timeout.
    #[arg(
        long,
        env,
        value_name = "operation_timeout",
        help_heading = "Timeout Options"
    )]
    operation_timeout_milliseconds: Option<u64>,

    /// operation attempt timeout (milliseconds). For details, see the AWS SDK for Rust TimeoutConfig documentation.
    /// The default has no timeout.
    #[arg(
        long,
        env,
        value_name = "operation_attempt_timeout",
        help_heading = "Timeout Options"
    )]
    operation_attempt_timeout_milliseconds: Option<u64>,

    /// connect timeout (milliseconds).
    /// The default has AWS SDK default timeout (Currently 3100 milliseconds).
    #[arg(
        long,
        env,
        value_name = "connect_timeout",
        help_heading = "Timeout Options"
    )]
    connect_timeout_milliseconds: Option<u64>,

    /// read timeout (milliseconds).
    /// The default has no timeout.
    #[arg(
        long,
        env,
        value_name = "read_timeout",
        help_heading = "Timeout Options"
    )]
    read_timeout_milliseconds: Option<u64>,

    /// generate a auto completions script. Valid values: bash, fish, zsh, powershell, elvish.
    #[arg(long, env, value_name = "SHELL", value_parser = clap_complete::shells::Shell::from_str, help_heading = "Advanced")]
    auto_complete_shell: Option<clap_complete::shells::Shell>,

    /// disable stalled stream protection
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_STALLED_STREAM_PROTECTION, help_heading = "Advanced")]
    disable_stalled_stream_protection: bool,

    /// unit test purpose only
    #[arg(long, hide = true, default_value_t = false, help_heading = "Dangerous")]
    allow_both_local_storage: bool,
}

pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    crate::Config::try_from(config_args)
}

impl CLIArgs {
    fn validate_storage_config(&self) -> Result<(), String> {
        self.check_source_local_storage()?;
        self.check_target_local_storage()?;
        self.check_storage_conflict()?;
        self.check_storage_credentials_conflict()?;
        self.check_endpoint_url_conflict()?;
        self.check_cache_dir_conflict()?;
        self.check_run_state_file()?;

        Ok(())
    }

    fn check_source_local_storage(&self) -> Result<(), String> {
        let source = storage_path::parse_storage_path(&self.source);

        if let StoragePath::Local(path) = source {
            if !path.is_dir() {
                return Err(SOURCE_LOCAL_STORAGE_DIR_NOT_FOUND.to_string());
            }
        }

        Ok(())
    }

    fn check_target_local_storage(&self) -> Result<(), String> {
        let target = storage_path::parse_storage_path(&self.target);

        if let StoragePath::Local(path) = target {
            if path.try_exists().is_err() {
                return Err(TARGET_LOCAL_STORAGE_INVALID.to_string());
            }
        }
        Ok(())
    }

    fn check_storage_conflict(&self) -> Result<(), String> {
        if self.allow_both_local_storage {
            return Ok(());
        }

        let source = storage_path::parse_storage_path(&self.source);
        let target = storage_path::parse_storage_path(&self.target);

        if storage_path::is_both_storage_local(&source, &target) {
            return Err(NO_S3_STORAGE_SPECIFIED.to_string());
        }

        Ok(())
    }

    fn check_storage_credentials_conflict(&self) -> Result<(), String> {
        let source = storage_path::parse_storage_path(&self.source);
        let target = storage_path::parse_storage_path(&self.target);

        if matches!(source, StoragePath::Local(_))
            && (self.source_profile.is_some() || self.source_access_key.is_some())
        {
            return Err(NO_SOURCE_CREDENTIAL_REQUIRED.to_string());
        }

        if matches!(target, StoragePath::Local(_))
            && (self.target_profile.is_some() || self.target_access_key.is_some())
        {
            return Err(NO_TARGET_CREDENTIAL_REQUIRED.to_string());
        }

        Ok(())
    }

    fn check_endpoint_url_conflict(&self) -> Result<(), String> {
        let source = storage_path::parse_storage_path(&self.source);
        if matches!(source, StoragePath::Local(_)) && self.source_endpoint_url.is_some() {
            return Err(SOURCE_LOCAL_STORAGE_SPECIFIED_WITH_ENDPOINT_URL.to_string());
        }

        let target = storage_path::parse_storage_path(&self.target);
        if matches!(target, StoragePath::Local(_)) && self.target_endpoint_url.is_some() {
            return Err(TARGET_LOCAL_STORAGE_SPECIFIED_WITH_ENDPOINT_URL.to_string());
        }

        Ok(())
    }

    // Staged files inside a local source would be listed as source objects.
    fn check_cache_dir_conflict(&self) -> Result<(), String> {
        let StoragePath::Local(source_dir) = storage_path::parse_storage_path(&self.source) else {
            return Ok(());
        };

        let cache_dir =
            std::path::absolute(&self.cache_dir).map_err(|_| INVALID_CACHE_DIR.to_string())?;
        let source_dir =
            std::path::absolute(source_dir).map_err(|_| INVALID_CACHE_DIR.to_string())?;

        if cache_dir.starts_with(source_dir) {
            return Err(CACHE_DIR_INSIDE_SOURCE.to_string());
        }

        Ok(())
    }

    fn check_run_state_file(&self) -> Result<(), String> {
        if self.run_state_file.is_dir() {
            return Err(RUN_STATE_FILE_IS_DIRECTORY.to_string());
        }

        Ok(())
    }

    fn build_transform_command(&self) -> Result<TransformCommand, String> {
        if self.transform_args.is_empty() {
            return Ok(self.transform_command.clone());
        }

        TransformCommand::from_words(self.transform_args.clone()).map_err(|e| format!("{e}\n"))
    }

    fn build_client_configs(&self) -> (Option<ClientConfig>, Option<ClientConfig>) {
        let source_credential = build_credential(
            self.source_profile.clone(),
            self.source_access_key.clone(),
            self.source_secret_access_key.clone(),
            self.source_session_token.clone(),
        );
        let target_credential = build_credential(
            self.target_profile.clone(),
            self.target_access_key.clone(),
            self.target_secret_access_key.clone(),
            self.target_session_token.clone(),
        );

        let source_client_config = ClientConfig {
            client_config_location: self.build_client_config_location(),
            credential: source_credential,
            region: self.source_region.clone(),
            endpoint_url: self.source_endpoint_url.clone(),
            force_path_style: self.source_force_path_style,
            retry_config: self.build_retry_config(),
            cli_timeout_config: self.build_cli_timeout_config(),
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
        };

        let target_client_config = ClientConfig {
            client_config_location: self.build_client_config_location(),
            credential: target_credential,
            region: self.target_region.clone(),
            endpoint_url: self.target_endpoint_url.clone(),
            force_path_style: self.target_force_path_style,
            retry_config: self.build_retry_config(),
            cli_timeout_config: self.build_cli_timeout_config(),
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
        };

        (Some(source_client_config), Some(target_client_config))
    }

    fn build_client_config_location(&self) -> ClientConfigLocation {
        ClientConfigLocation {
            aws_config_file: self.aws_config_file.clone(),
            aws_shared_credentials_file: self.aws_shared_credentials_file.clone(),
        }
    }

    fn build_retry_config(&self) -> RetryConfig {
        RetryConfig {
            aws_max_attempts: self.aws_max_attempts,
            initial_backoff_milliseconds: self.initial_backoff_milliseconds,
        }
    }

    fn build_cli_timeout_config(&self) -> CLITimeoutConfig {
        CLITimeoutConfig {
            operation_timeout_milliseconds: self.operation_timeout_milliseconds,
            operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
            connect_timeout_milliseconds: self.connect_timeout_milliseconds,
            read_timeout_milliseconds: self.read_timeout_milliseconds,
        }
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let tracing_config = self.verbosity.log_level().map(|log_level| TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        });

        if !self.dry_run {
            return tracing_config;
        }

        // dry-run reports candidates at info level.
        match tracing_config {
            None => Some(TracingConfig {
                tracing_level: log::Level::Info,
                json_tracing: DEFAULT_JSON_TRACING,
                aws_sdk_tracing: DEFAULT_AWS_SDK_TRACING,
                span_events_tracing: DEFAULT_SPAN_EVENTS_TRACING,
                disable_color_tracing: DEFAULT_DISABLE_COLOR_TRACING,
            }),
            Some(config) if config.tracing_level < log::Level::Info => Some(TracingConfig {
                tracing_level: log::Level::Info,
                ..config
            }),
            config => config,
        }
    }
}

fn build_credential(
    profile: Option<String>,
    access_key: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
) -> S3Credentials {
    if let Some(profile) = profile {
        return S3Credentials::Profile(profile);
    }

    match (access_key, secret_access_key) {
        (Some(access_key), Some(secret_access_key)) => S3Credentials::Credentials {
            access_keys: AccessKeys {
                access_key,
                secret_access_key,
                session_token,
            },
        },
        _ => S3Credentials::FromEnvironment,
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(value: CLIArgs) -> Result<Self, Self::Error> {
        value.validate_storage_config()?;

        let transform_command = value.build_transform_command()?;
        let tracing_config = value.build_tracing_config();
        let (source_client_config, target_client_config) = value.build_client_configs();

        let canned_acl = if value.disable_acl {
            None
        } else {
            Some(value.acl.clone())
        };

        Ok(Config {
            source: storage_path::parse_storage_path(&value.source),
            target: storage_path::parse_storage_path(&value.target),

            source_client_config,
            target_client_config,

            tracing_config,

            worker_size: value.worker_size,
            page_size: value.page_size,
            dry_run: value.dry_run,
            show_no_progress: value.show_no_progress,
            cache_dir: value.cache_dir,
            run_state_file: value.run_state_file,
            since: value.since,
            retry_failed_keys: !value.disable_failed_key_retry,

            filter_config: FilterConfig {
                extension: value.filter_extension,
                include_regex: value.filter_include_regex,
                exclude_regex: value.filter_exclude_regex,
            },
            transform_config: TransformConfig {
                command: transform_command,
                timeout_milliseconds: value.transform_timeout_milliseconds,
            },
            upload_config: UploadConfig {
                canned_acl,
                content_type: value.content_type,
            },

            auto_complete_shell: value.auto_complete_shell,
        })
    }
}
