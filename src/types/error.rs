use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BucketBrigadeError {
    #[error("a object references a parent directory.")]
    DirectoryTraversalError,
    #[error("cancelled")]
    Cancelled,
    #[error("a key that names a directory cannot be staged: {0}")]
    DirectoryKeyError(String),
    #[error("failed to prepare the staging directory: {0}")]
    StagingError(String),
    #[error("transform command failed with {status}: {key}")]
    TransformFailed { key: String, status: String },
    #[error("transform command timed out after {milliseconds} milliseconds: {key}")]
    TransformTimeout { key: String, milliseconds: u64 },
    #[error("transform command did not produce an output file: {key}")]
    TransformOutputMissing { key: String },
    #[error("run state file is corrupt: {0}")]
    InvalidRunState(String),
}

pub fn is_fatal_error(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<BucketBrigadeError>(),
        Some(BucketBrigadeError::StagingError(_))
            | Some(BucketBrigadeError::InvalidRunState(_))
            | Some(BucketBrigadeError::Cancelled)
    )
}
