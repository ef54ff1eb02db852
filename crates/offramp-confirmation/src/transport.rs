//! HTTP plumbing shared by the chain clients.

use crate::ChainQueryError;
use std::time::Duration;

/// Builds a client whose every request is bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ChainQueryError> {
	reqwest::Client::builder()
		.timeout(timeout)
		.build()
		.map_err(|e| ChainQueryError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Maps a failed send or body read onto the error taxonomy.
pub(crate) fn request_error(err: reqwest::Error) -> ChainQueryError {
	if err.is_timeout() {
		ChainQueryError::Network(format!("request timed out: {}", err))
	} else if err.is_connect() || err.is_request() || err.is_body() {
		ChainQueryError::Network(err.to_string())
	} else {
		ChainQueryError::InvalidResponse(err.to_string())
	}
}

/// Classifies a non-success HTTP status.
///
/// Returns `Ok(())` for 2xx. Callers handle chain-specific statuses (such
/// as a 404 meaning "not indexed yet") before calling this.
pub(crate) fn check_status(status: u16, body: &str) -> Result<(), ChainQueryError> {
	match status {
		200..=299 => Ok(()),
		401 | 403 => Err(ChainQueryError::Unauthorized(status)),
		429 => Err(ChainQueryError::RateLimited),
		500..=599 => Err(ChainQueryError::Network(format!(
			"HTTP {}: {}",
			status,
			snippet(body)
		))),
		_ => Err(ChainQueryError::Rejected {
			status,
			message: snippet(body),
		}),
	}
}

/// First 200 characters of a response body, for diagnostics.
fn snippet(body: &str) -> String {
	let trimmed = body.trim();
	match trimmed.char_indices().nth(200) {
		Some((idx, _)) => format!("{}...", &trimmed[..idx]),
		None => trimmed.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_classification() {
		assert!(check_status(200, "").is_ok());
		assert_eq!(check_status(401, ""), Err(ChainQueryError::Unauthorized(401)));
		assert_eq!(check_status(403, ""), Err(ChainQueryError::Unauthorized(403)));
		assert_eq!(check_status(429, ""), Err(ChainQueryError::RateLimited));
		assert!(matches!(
			check_status(503, "upstream down"),
			Err(ChainQueryError::Network(msg)) if msg.contains("upstream down")
		));
		assert!(matches!(
			check_status(400, "bad hash"),
			Err(ChainQueryError::Rejected { status: 400, .. })
		));
	}

	#[test]
	fn test_snippet_truncates_long_bodies() {
		let body = "x".repeat(500);
		let short = snippet(&body);
		assert_eq!(short.len(), 203);
		assert!(short.ends_with("..."));
	}
}
