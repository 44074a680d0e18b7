use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::config::TransformConfig;
use crate::types::error::BucketBrigadeError;
use crate::types::{StagedFile, StagingRole};

/// Runs the external transform command on one staged original.
///
/// The command is spawned directly with the rendered argument list. stdin is
/// closed, stdout and stderr are captured and logged.
pub struct Transformer {
    config: TransformConfig,
}

impl Transformer {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, original: &StagedFile, destination: &Path) -> Result<StagedFile> {
        let key = original.key.as_str();
        let command = &self.config.command;

        let mut process = tokio::process::Command::new(command.program());
        process
            .args(command.render_args(&original.path, destination))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.config.timeout_milliseconds {
            Some(milliseconds) => {
                tokio::time::timeout(Duration::from_millis(milliseconds), process.output())
                    .await
                    .map_err(|_| {
                        anyhow!(BucketBrigadeError::TransformTimeout {
                            key: key.to_string(),
                            milliseconds,
                        })
                    })?
            }
            None => process.output().await,
        }
        .with_context(|| format!("failed to spawn transform command: {}", command.program()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let status = output.status.to_string();
            warn!(
                key = key,
                status = status,
                stdout = stdout,
                stderr = stderr,
                "transform command failed."
            );

            return Err(anyhow!(BucketBrigadeError::TransformFailed {
                key: key.to_string(),
                status,
            }));
        }

        debug!(
            key = key,
            stdout = stdout,
            stderr = stderr,
            "transform command completed."
        );

        if !tokio::fs::try_exists(destination).await.unwrap_or(false) {
            return Err(anyhow!(BucketBrigadeError::TransformOutputMissing {
                key: key.to_string(),
            }));
        }

        Ok(StagedFile {
            role: StagingRole::Transformed,
            key: key.to_string(),
            path: destination.to_path_buf(),
        })
    }
}
