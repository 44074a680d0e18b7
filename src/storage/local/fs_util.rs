use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use filetime::{FileTime, set_file_mtime};
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::trace;

pub fn check_directory_traversal(key: &str) -> bool {
    Regex::new(r"\.\.[/\\]")
        .map(|re| re.is_match(key))
        .unwrap_or(true)
}

pub fn is_key_a_directory(key: &str) -> bool {
    if cfg!(windows) && key.ends_with('\\') {
        return true;
    }

    key.ends_with('/')
}

pub fn remove_root_slash(key: &str) -> String {
    key.trim_start_matches('/').to_string()
}

pub fn key_to_file_path(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in remove_root_slash(key).split('/') {
        path.push(component);
    }
    path
}

/// Inverse of `key_to_file_path`. Returns `None` for paths outside `root`.
pub fn file_path_to_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let components: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect();
    if components.is_empty() {
        return None;
    }

    Some(components.join("/"))
}

pub async fn get_last_modified(path: &Path) -> Result<DateTime<Utc>> {
    let modified = tokio::fs::metadata(path)
        .await
        .context("tokio::fs::metadata() failed.")?
        .modified()
        .context("std::fs::Metadata::modified() failed.")?;

    Ok(DateTime::<Utc>::from(modified))
}

pub fn set_last_modified(path: &Path, last_modified: &DateTime<Utc>) -> std::io::Result<()> {
    set_file_mtime(
        path,
        FileTime::from_unix_time(
            last_modified.timestamp(),
            last_modified.timestamp_subsec_nanos(),
        ),
    )
}

/// Creates the parent directories of `path` and a temporary file beside it,
/// so that `NamedTempFile::persist` is a rename within one filesystem.
pub async fn create_temp_file_for(path: &Path) -> Result<NamedTempFile> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    create_directory_hierarchy(&directory).await?;

    NamedTempFile::new_in(&directory).context("NamedTempFile::new_in failed.")
}

pub async fn create_directory_hierarchy(directory: &Path) -> Result<bool> {
    if directory.try_exists().unwrap_or(false) {
        return Ok(false);
    }

    tokio::fs::create_dir_all(directory)
        .await
        .context("tokio::fs::create_dir_all() failed.")?;

    let directory = directory.to_string_lossy().to_string();
    trace!(directory = directory, "directory created.");

    Ok(true)
}
