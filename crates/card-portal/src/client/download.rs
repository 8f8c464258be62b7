//! Fetching stored documents and profile pictures for administrators.
//!
//! Stored URLs are not always usable as-is: records created against development hosts keep
//! `localhost` origins, some carry a duplicated-domain artefact, and others are bare relative
//! paths. `normalize_asset_url` maps all of them onto the public asset origin, and
//! `download_document` falls back to the raw URL when the normalized one cannot be fetched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{ClientError, HttpPortalClient};

const DEVELOPMENT_ORIGINS: [&str; 2] = ["http://localhost:5253", "https://localhost:7174"];
const DUPLICATED_DOMAIN_MARKERS: [&str; 2] = [
    "https://ndaid.help/.ndaid.help/api",
    "http://ndaid.help/.ndaid.help/api",
];

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("no URL provided")]
    EmptyUrl,
    #[error("download failed for every candidate URL: {last}")]
    Exhausted { last: ClientError },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rewrites a stored asset URL onto `asset_origin`.
pub fn normalize_asset_url(raw: &str, asset_origin: &str) -> String {
    let origin = asset_origin.trim_end_matches('/');
    let mut url = raw.trim().to_string();
    if url.is_empty() {
        return url;
    }

    for marker in DUPLICATED_DOMAIN_MARKERS {
        url = replace_ignore_ascii_case(&url, marker, origin);
    }
    for development in DEVELOPMENT_ORIGINS {
        url = replace_ignore_ascii_case(&url, development, origin);
    }

    if !url.starts_with("http") {
        let path = url.trim_start_matches('/');
        url = format!("{origin}/{path}");
    }
    url
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    let lowered = haystack.to_ascii_lowercase();
    let needle_lower = needle.to_ascii_lowercase();
    let mut result = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(offset) = lowered[cursor..].find(&needle_lower) {
        let start = cursor + offset;
        result.push_str(&haystack[cursor..start]);
        result.push_str(replacement);
        cursor = start + needle.len();
    }
    result.push_str(&haystack[cursor..]);
    result
}

/// Last path segment of a URL, used when the caller gives no file name.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

/// Candidate URLs in the order they are tried.
pub fn candidate_urls(raw: &str, asset_origin: &str) -> Vec<String> {
    let normalized = normalize_asset_url(raw, asset_origin);
    let mut candidates = vec![normalized];
    let raw = raw.trim();
    if raw.starts_with("http") && !candidates.iter().any(|url| url == raw) {
        candidates.push(raw.to_string());
    }
    candidates
}

/// Downloads a stored document into `directory`, returning the written path.
pub fn download_document(
    client: &HttpPortalClient,
    raw_url: &str,
    asset_origin: &str,
    directory: &Path,
    file_name: Option<&str>,
) -> Result<PathBuf, DownloadError> {
    if raw_url.trim().is_empty() {
        return Err(DownloadError::EmptyUrl);
    }

    let mut last_error = None;
    for url in candidate_urls(raw_url, asset_origin) {
        match client.fetch_bytes(&url) {
            Ok(bytes) => {
                let name = file_name
                    .map(str::to_string)
                    .or_else(|| file_name_from_url(&url))
                    .unwrap_or_else(|| "document".to_string());
                let path = directory.join(name);
                fs::write(&path, &bytes).map_err(|source| DownloadError::Write {
                    path: path.clone(),
                    source,
                })?;
                info!(%url, path = %path.display(), bytes = bytes.len(), "document downloaded");
                return Ok(path);
            }
            Err(err) => {
                warn!(%url, error = %err, "document download attempt failed");
                last_error = Some(err);
            }
        }
    }

    Err(DownloadError::Exhausted {
        last: last_error.unwrap_or_else(|| ClientError::Transport("no candidate URL".to_string())),
    })
}
