use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;
pub mod token;
pub mod transform_command;

/// One listed source object. `key` is relative to the source prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: i64,
}

impl ObjectRecord {
    pub fn new(key: &str, last_modified: DateTime<Utc>, size: i64) -> Self {
        Self {
            key: key.to_string(),
            last_modified,
            size,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn last_modified(&self) -> &DateTime<Utc> {
        &self.last_modified
    }

    pub fn size(&self) -> i64 {
        self.size
    }
}

/// Listing cursor: the raw key of the last object of the previous page.
/// `None` means the start of the bucket.
pub type Cursor = Option<String>;

/// One page of a listing.
///
/// `next_marker` tracks the raw listing position, including entries that were
/// not turned into records (e.g. the prefix directory marker). It is `None`
/// only when the listing returned nothing, which means the bucket is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPage {
    pub objects: Vec<ObjectRecord>,
    pub next_marker: Cursor,
}

impl ObjectPage {
    pub fn is_exhausted(&self) -> bool {
        self.next_marker.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingRole {
    Original,
    Transformed,
}

impl StagingRole {
    pub fn dir_name(&self) -> &'static str {
        match self {
            StagingRole::Original => "originals",
            StagingRole::Transformed => "transformed",
        }
    }
}

/// A file in the staging cache, owned by the stage currently processing it.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub role: StagingRole,
    pub key: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Init,
    Listing,
    Syncing,
    AdvancePage,
    Done,
    Aborted,
}

#[derive(Debug, PartialEq)]
pub enum SyncStatistics {
    SyncBytes(u64),
    SyncComplete { key: String },
    SyncSkip { key: String },
    SyncError { key: String },
    SyncWarning { key: String },
    TransformComplete { key: String },
    PageComplete { objects: u64 },
}

#[derive(Debug, Clone)]
pub enum StoragePath {
    S3 { bucket: String, prefix: String },
    Local(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
