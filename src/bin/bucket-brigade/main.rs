use std::ffi::OsString;
use std::io::Write;

use ::tracing::trace;
use anyhow::Result;
use clap::CommandFactory;
use clap::error::ErrorKind;
use clap_complete::{Shell, generate};
use rusty_fork::rusty_fork_test;

use bucket_brigade::CLIArgs;
use bucket_brigade::Config;
use bucket_brigade::config::args::parse_from_args;

mod cli;
mod tracing;

const BIN_NAME: &str = "bucket-brigade";

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<()> {
    // Credentials and options may come from a .env file in the working directory.
    dotenvy::dotenv().ok();

    let config = load_config(std::env::args_os()).unwrap_or_else(|e| e.exit());

    if let Some(shell) = config.auto_complete_shell {
        write_completion(shell, &mut std::io::stdout());
        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    cli::run(config).await
}

/// Parses the command line. Validation failures are reported the way clap
/// reports its own, so `exit()` prints usage and exits with 2.
fn load_config<I, T>(args: I) -> Result<Config, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = parse_from_args(args)?;
    Config::try_from(args)
        .map_err(|message| clap::Error::raw(ErrorKind::ValueValidation, message))
}

fn write_completion(shell: Shell, out: &mut dyn Write) {
    generate(shell, &mut CLIArgs::command(), BIN_NAME, out);
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing::init_tracing(tracing_config);
    true
}


rusty_fork_test! {
    #[test]
    fn with_tracing() {
        let config = load_config([
            BIN_NAME,
            "--source-profile",
            "source_profile",
            "--target-profile",
            "target_profile",
            "s3://source-bucket",
            "s3://target-bucket",
        ])
        .unwrap();

        assert!(start_tracing_if_necessary(&config));
    }

    #[test]
    fn without_tracing() {
        let config = load_config([
            BIN_NAME,
            "--source-profile",
            "source_profile",
            "--target-profile",
            "target_profile",
            "-qq",
            "s3://source-bucket",
            "s3://target-bucket",
        ])
        .unwrap();

        assert!(!start_tracing_if_necessary(&config));
    }
}
