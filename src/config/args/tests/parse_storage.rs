#[cfg(test)]
mod tests {
    use crate::config::args::*;

    #[test]
    fn validate_storage_config_source_s3() {
        init_dummy_tracing_subscriber();

        let target_dir = tempfile::tempdir().unwrap();
        let target = target_dir.path().to_str().unwrap();
        let args = vec![
            "bucket-brigade",
            "--source-profile",
            "source_profile",
            "s3://source-bucket",
            target,
        ];

        let config_args = parse_from_args(args).unwrap();
        assert!(config_args.validate_storage_config().is_ok());
    }

    #[test]
    fn validate_storage_config_target_s3() {
        init_dummy_tracing_subscriber();

        let source_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().to_str().unwrap();
        let args = vec![
            "bucket-brigade",
            "--target-profile",
            "target_profile",
            source,
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert!(config_args.validate_storage_config().is_ok());
    }

    #[test]
    fn validate_storage_config_both_s3() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "bucket-brigade",
            "--source-profile",
            "source_profile",
            "--target-profile",
            "target_profile",
            "s3://source-bucket",
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert!(config_args.validate_storage_config().is_ok());
    }

    #[test]
    fn validate_storage_config_both_storage_local() {
        init_dummy_tracing_subscriber();

        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            source_dir.path().to_str().unwrap(),
            target_dir.path().to_str().unwrap(),
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            NO_S3_STORAGE_SPECIFIED
        );
    }

    #[test]
    fn validate_storage_config_both_storage_local_allowed() {
        init_dummy_tracing_subscriber();

        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            "--allow-both-local-storage",
            source_dir.path().to_str().unwrap(),
            target_dir.path().to_str().unwrap(),
        ];

        let config_args = parse_from_args(args).unwrap();
        assert!(config_args.validate_storage_config().is_ok());
    }

    #[test]
    fn validate_storage_config_source_dir_not_found() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "bucket-brigade",
            "./no-such-dir-3c6f1a/",
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            SOURCE_LOCAL_STORAGE_DIR_NOT_FOUND
        );
    }

    #[test]
    fn validate_storage_config_source_credential_not_required() {
        init_dummy_tracing_subscriber();

        let source_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            "--source-profile",
            "source_profile",
            source_dir.path().to_str().unwrap(),
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            NO_SOURCE_CREDENTIAL_REQUIRED
        );
    }

    #[test]
    fn validate_storage_config_target_credential_not_required() {
        init_dummy_tracing_subscriber();

        let target_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            "--target-access-key",
            "target_access_key",
            "--target-secret-access-key",
            "target_secret_access_key",
            "s3://source-bucket",
            target_dir.path().to_str().unwrap(),
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            NO_TARGET_CREDENTIAL_REQUIRED
        );
    }

    #[test]
    fn validate_storage_config_both_endpoint_url() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "bucket-brigade",
            "--source-endpoint-url",
            "https://source.endpoint.local",
            "--target-endpoint-url",
            "http://target.endpoint.local:9000",
            "s3://source-bucket",
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert!(config_args.validate_storage_config().is_ok());
    }

    #[test]
    fn validate_storage_config_source_local_endpoint_url() {
        init_dummy_tracing_subscriber();

        let source_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            "--source-endpoint-url",
            "https://source.endpoint.local",
            source_dir.path().to_str().unwrap(),
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            SOURCE_LOCAL_STORAGE_SPECIFIED_WITH_ENDPOINT_URL
        );
    }

    #[test]
    fn validate_storage_config_target_local_endpoint_url() {
        init_dummy_tracing_subscriber();

        let target_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            "--target-endpoint-url",
            "https://target.endpoint.local",
            "s3://source-bucket",
            target_dir.path().to_str().unwrap(),
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            TARGET_LOCAL_STORAGE_SPECIFIED_WITH_ENDPOINT_URL
        );
    }

    #[test]
    fn validate_cache_dir_inside_local_source() {
        init_dummy_tracing_subscriber();

        let source_dir = tempfile::tempdir().unwrap();
        let cache_dir = source_dir.path().join("cache");
        let args = vec![
            "bucket-brigade",
            "--cache-dir",
            cache_dir.to_str().unwrap(),
            source_dir.path().to_str().unwrap(),
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            CACHE_DIR_INSIDE_SOURCE
        );
    }

    #[test]
    fn validate_cache_dir_outside_local_source() {
        init_dummy_tracing_subscriber();

        let source_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            "--cache-dir",
            cache_dir.path().to_str().unwrap(),
            source_dir.path().to_str().unwrap(),
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert!(config_args.validate_storage_config().is_ok());
    }

    #[test]
    fn validate_run_state_file_is_directory() {
        init_dummy_tracing_subscriber();

        let state_dir = tempfile::tempdir().unwrap();
        let args = vec![
            "bucket-brigade",
            "--run-state-file",
            state_dir.path().to_str().unwrap(),
            "s3://source-bucket",
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        assert_eq!(
            config_args.validate_storage_config().unwrap_err(),
            RUN_STATE_FILE_IS_DIRECTORY
        );
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
