//! URL handling for caller-supplied Moodle instances

use thiserror::Error;
use url::Url;

/// Path that issues web-service tokens
pub const TOKEN_PATH: &str = "login/token.php";

/// Single REST web-service endpoint
pub const WEBSERVICE_PATH: &str = "webservice/rest/server.php";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Moodle URL is empty")]
    Empty,

    #[error("Invalid Moodle URL: {0}")]
    Invalid(String),
}

/// Normalize a user-entered instance URL.
///
/// A missing scheme becomes `https://` and the path always ends in `/`. Only
/// `http` and `https` are accepted, and a query or fragment is rejected.
pub fn normalize_moodle_url(input: &str) -> Result<String, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    // `host:port` would otherwise parse as a URL with scheme `host`
    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{}", trimmed))
    }
    .map_err(|e| UrlError::Invalid(e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::Invalid(format!(
            "unsupported scheme {} in {}",
            parsed.scheme(),
            trimmed
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::Invalid(format!("no host in {}", trimmed)));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(UrlError::Invalid(format!(
            "query or fragment not allowed in {}",
            trimmed
        )));
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed.to_string())
}

/// Join a site-relative path onto an instance URL
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Append the bearer token to a Moodle file URL as a query parameter
pub fn with_token(file_url: &str, token: &str) -> String {
    let separator = if file_url.contains('?') { '&' } else { '?' };
    let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!("{}{}token={}", file_url, separator, encoded)
}

/// Whether `file_url` points at the same scheme, host and port as `base_url`
pub fn same_origin(base_url: &str, file_url: &str) -> bool {
    match (Url::parse(base_url), Url::parse(file_url)) {
        (Ok(base), Ok(file)) => base.origin() == file.origin(),
        _ => false,
    }
}
