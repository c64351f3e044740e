//! Error handling utilities for the review-ai CLI tool.
//!
//! This module provides helpers for detecting and handling specific error types,
//! particularly authentication failures from the completion API.

use anyhow::Error;

/// Checks if an error represents an authentication failure from the
/// completion endpoint.
///
/// Reviewing retries the remaining files after an ordinary per-file error,
/// but an authentication failure will fail every following call the same
/// way, so it is detected and aborts the run instead.
///
/// # Examples
///
/// ```
/// use anyhow::anyhow;
/// use review::error::is_auth_error;
///
/// let error = anyhow!("invalid_api_key: Incorrect API key provided");
/// assert!(is_auth_error(&error));
/// ```
pub fn is_auth_error(error: &Error) -> bool {
  let msg = error.to_string().to_lowercase();

  // OpenAI-compatible API key errors
  msg.contains("invalid_api_key") ||
  msg.contains("incorrect api key") ||
  msg.contains("api key not found") ||

  // Generic auth failures (scoped to avoid false positives)
  (msg.contains("authentication") && msg.contains("api")) ||
  (msg.contains("unauthorized") && msg.contains("api"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::anyhow;

  #[test]
  fn test_detects_invalid_api_key() {
    let error = anyhow!("invalid_api_key: Incorrect API key provided");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_detects_incorrect_api_key() {
    let error = anyhow!("Incorrect API key provided: sk-xxxxx");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_detects_missing_key() {
    let error = anyhow!("ERROR: OpenAI API key not found.");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_detects_api_scoped_auth_failure() {
    let error = anyhow!("API authentication failed");
    assert!(is_auth_error(&error));
  }

  #[test]
  fn test_ignores_generic_auth_errors() {
    // Should not match auth errors without API context
    let error = anyhow!("Database authentication timeout");
    assert!(!is_auth_error(&error));

    let error = anyhow!("OAuth2 unauthorized redirect");
    assert!(!is_auth_error(&error));
  }

  #[test]
  fn test_ignores_unrelated_errors() {
    let error = anyhow!("File not found");
    assert!(!is_auth_error(&error));
  }
}
