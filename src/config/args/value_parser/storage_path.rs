use percent_encoding::percent_decode_str;
use regex::Regex;
use url::{ParseError, Url};

use crate::types::StoragePath;

const INVALID_SCHEME: &str = "scheme must be s3:// .";
const INVALID_PATH: &str = "path must be a valid URL or a local path.";
const NO_BUCKET_NAME_SPECIFIED: &str = "bucket name must be specified.";
const NO_PATH_SPECIFIED: &str = "path must be specified.";
const WINDOWS_ABSOLUTE_PATH_REGEX: &str = r"^[a-zA-Z]:\\";

/// Accepts `s3://bucket[/prefix]` or a local directory. A local directory is
/// normalized to end with the path separator.
pub fn check_storage_path(path: &str) -> Result<String, String> {
    match Url::parse(path) {
        Err(ParseError::RelativeUrlWithoutBase) => {
            if path.is_empty() {
                return Err(NO_PATH_SPECIFIED.to_string());
            }
            Ok(with_trailing_separator(path))
        }
        Err(_) => Err(INVALID_PATH.to_string()),
        Ok(parsed) if parsed.scheme() == "s3" => {
            if parsed.host_str().is_none_or(str::is_empty) {
                return Err(NO_BUCKET_NAME_SPECIFIED.to_string());
            }
            Ok(path.to_string())
        }
        Ok(_) if is_windows_absolute_path(path) => Ok(with_trailing_separator(path)),
        Ok(_) => Err(INVALID_SCHEME.to_string()),
    }
}

/// Converts a path accepted by `check_storage_path`.
pub fn parse_storage_path(path: &str) -> StoragePath {
    if is_windows_absolute_path(path) {
        return StoragePath::Local(path.into());
    }

    match Url::parse(path) {
        Ok(parsed) if parsed.scheme() == "s3" => parse_s3_url(&parsed),
        _ => StoragePath::Local(path.into()),
    }
}

pub fn is_both_storage_local(source: &StoragePath, target: &StoragePath) -> bool {
    matches!(source, StoragePath::Local(_)) && matches!(target, StoragePath::Local(_))
}

fn parse_s3_url(parsed: &Url) -> StoragePath {
    let bucket = parsed.host_str().unwrap_or_default().to_string();

    // the url path always starts with '/'
    let raw_prefix = parsed.path().strip_prefix('/').unwrap_or(parsed.path());
    let prefix = percent_decode_str(raw_prefix)
        .decode_utf8_lossy()
        .to_string();

    StoragePath::S3 { bucket, prefix }
}

fn with_trailing_separator(path: &str) -> String {
    if path.ends_with(std::path::MAIN_SEPARATOR) {
        return path.to_string();
    }
    format!("{}{}", path, std::path::MAIN_SEPARATOR)
}

fn is_windows_absolute_path(path: &str) -> bool {
    if !cfg!(windows) {
        return false;
    }

    Regex::new(WINDOWS_ABSOLUTE_PATH_REGEX)
        .map(|re| re.is_match(path))
        .unwrap_or(false)
}
