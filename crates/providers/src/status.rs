//! HTTP status → `ProviderError` mapping shared by the HTTP backends.

use sevasaathi_core::ProviderError;

/// Seconds to wait on a 429 without a usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Body fragments that mark a 429 as a hard quota rather than a rate limit.
const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "exceeded your current quota"];

/// Classify a non-success response.
///
/// `retry_after` is the parsed `Retry-After` header, if any.
pub(crate) fn classify(status: u16, body: &str, retry_after: Option<u64>) -> ProviderError {
    let lower = body.to_lowercase();
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(summarize(body)),
        400 if body.contains("API_KEY_INVALID") => {
            ProviderError::AuthenticationFailed(summarize(body))
        }
        400 | 413 | 422 => ProviderError::InvalidRequest(summarize(body)),
        404 => ProviderError::ModelNotFound(summarize(body)),
        429 if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) => {
            ProviderError::QuotaExceeded(summarize(body))
        }
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message: summarize(body),
        },
    }
}

/// Parse a `Retry-After` header given in whole seconds.
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Transport failure → `Timeout` or `Network`. The URL is stripped since
/// some backends carry the key in the query string.
pub(crate) fn transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.without_url().to_string())
    } else {
        ProviderError::Network(err.without_url().to_string())
    }
}

/// Keep error bodies to a readable size.
fn summarize(body: &str) -> String {
    const LIMIT: usize = 300;
    let trimmed = body.trim();
    if trimmed.chars().count() <= LIMIT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(LIMIT).collect();
        format!("{cut}…")
    }
}
