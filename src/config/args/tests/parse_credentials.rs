#[cfg(test)]
mod tests {
    use crate::config::args::*;

    #[test]
    fn parse_from_args_both_profile() {
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
        let (source_config, target_config) = config_args.build_client_configs();

        if let S3Credentials::Profile(profile_name) = source_config.unwrap().credential {
            assert_eq!(profile_name, "source_profile".to_string());
        } else {
            // skipcq: RS-W1021
            assert!(false, "no source client profile");
        }

        if let S3Credentials::Profile(profile_name) = target_config.unwrap().credential {
            assert_eq!(profile_name, "target_profile".to_string());
        } else {
            // skipcq: RS-W1021
            assert!(false, "no target client profile");
        }
    }

    #[test]
    fn parse_from_args_both_access_keys() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "bucket-brigade",
            "--source-access-key",
            "source_access_key",
            "--source-secret-access-key",
            "source_secret_access_key",
            "--source-session-token",
            "source_session_token",
            "--target-access-key",
            "target_access_key",
            "--target-secret-access-key",
            "target_secret_access_key",
            "s3://source-bucket",
            "s3://target-bucket",
        ];

        let config_args = parse_from_args(args).unwrap();
        let (source_config, target_config) = config_args.build_client_configs();

        if let S3Credentials::Credentials { access_keys } = source_config.unwrap().credential {
            assert_eq!(access_keys.access_key, "source_access_key".to_string());
            assert_eq!(
                access_keys.secret_access_key,
                "source_secret_access_key".to_string()
            );
            assert_eq!(
                access_keys.session_token,
                Some("source_session_token".to_string())
            );
        } else {
            // skipcq: RS-W1021
            assert!(false, "no source access keys");
        }

        if let S3Credentials::Credentials { access_keys } = target_config.unwrap().credential {
            assert_eq!(access_keys.access_key, "target_access_key".to_string());
            assert!(access_keys.session_token.is_none());
        } else {
            // skipcq: RS-W1021
            assert!(false, "no target access keys");
        }
    }

    #[test]
    fn parse_from_args_from_environment() {
        init_dummy_tracing_subscriber();

        let args = vec!["bucket-brigade", "s3://source-bucket", "s3://target-bucket"];

        let config_args = parse_from_args(args).unwrap();
        let (source_config, target_config) = config_args.build_client_configs();

        assert!(matches!(
            source_config.unwrap().credential,
            S3Credentials::FromEnvironment
        ));
        assert!(matches!(
            target_config.unwrap().credential,
            S3Credentials::FromEnvironment
        ));
    }

    #[test]
    fn parse_from_args_profile_conflicts_with_access_key() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "bucket-brigade",
            "--source-profile",
            "source_profile",
            "--source-access-key",
            "source_access_key",
            "--source-secret-access-key",
            "source_secret_access_key",
            "s3://source-bucket",
            "s3://target-bucket",
        ];

        assert!(parse_from_args(args).is_err());
    }

    #[test]
    fn parse_from_args_access_key_requires_secret() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "bucket-brigade",
            "--target-access-key",
            "target_access_key",
            "s3://source-bucket",
            "s3://target-bucket",
        ];

        assert!(parse_from_args(args).is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
