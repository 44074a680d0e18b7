use url::Url;

const INVALID_SCHEME: &str = "scheme must be https:// or http:// .";
const MISSING_HOST: &str = "endpoint url must contain a host.";

/// Validates an S3-compatible endpoint such as `http://127.0.0.1:9000`.
pub fn check_scheme(url: &str) -> Result<String, String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;

    if !matches!(parsed.scheme(), "https" | "http") {
        return Err(INVALID_SCHEME.to_string());
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(MISSING_HOST.to_string());
    }

    Ok(url.to_string())
}
