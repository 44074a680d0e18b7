/*!
# Overview
bucket-brigade incrementally copies objects from one bucket to another and runs
an external command on every object in transit, for example to resize or
recompress images.

## Features
- Incremental
  Only objects modified since the start of the last completed run are processed.
  The run time is recorded only after the whole source has been listed and
  processed, so an interrupted run is simply repeated by the next invocation.
  Objects that failed in a completed run are retried by the next run.

- Bounded memory and disk usage
  The source is listed page by page. The local staging directory holds one page
  worth of files and is cleared before the next page is listed.

- Failure isolation
  A failed download, transform or upload of one object is logged and recorded,
  and the run continues with the next object.

- Typed transform command
  The transform is a program with an argument list that contains `{source}` and
  `{destination}` slots. It is executed directly, never through a shell.

- Storage
  - S3 (S3-compatible storage) to S3
  - local directory to S3, S3 to local directory

## As a library
The CLI is a thin wrapper of the library. All CLI arguments can be passed to the
library through `parse_from_args`.

Example usage
=============

```Toml
[dependencies]
bucket-brigade = "0.3"
tokio = { version = "1", features = ["full"] }
```

```no_run
use bucket_brigade::config::Config;
use bucket_brigade::config::args::parse_from_args;
use bucket_brigade::pipeline::Pipeline;
use bucket_brigade::types::SyncStatistics;
use bucket_brigade::types::token::create_pipeline_cancellation_token;

#[tokio::main]
async fn main() {
    // You can use all the arguments for the CLI.
    let args = vec![
        "program_name",
        "--filter-extension",
        ".jpg",
        "s3://source-bucket/photos/",
        "s3://target-bucket/photos/",
        "--",
        "magick",
        "{source}",
        "-resize",
        "50%",
        "{destination}",
    ];

    let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

    // You can use this token to cancel the pipeline.
    let cancellation_token = create_pipeline_cancellation_token();
    let mut pipeline = Pipeline::new(config, cancellation_token).await;
    let stats_receiver = pipeline.get_stats_receiver();

    pipeline.run().await;

    let mut total_sync_count = 0;
    while let Ok(sync_stats) = stats_receiver.try_recv() {
        if matches!(sync_stats, SyncStatistics::SyncComplete { .. }) {
            total_sync_count += 1;
        }
    }
    println!("Total sync count: {total_sync_count}");

    // Fatal errors abort the run and leave the run state untouched.
    if pipeline.has_error() {
        println!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }

    // Per-object failures are warnings. They are retried by the next run.
    if pipeline.has_warning() {
        println!("failed objects: {:?}", pipeline.get_failed_keys());
    }
}
```
*/

pub use config::Config;
pub use config::args::CLIArgs;

pub mod config;
pub mod pipeline;
pub mod run_state;
pub mod storage;
pub mod types;
