//! Merge request providers.
//!
//! Each provider knows how to turn a merge/pull request URL into a
//! [`MergeRequest`]: metadata, per-file changes and the concatenated
//! unified diff the parser and reviewers consume.

pub mod github;
pub mod gitlab;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
  #[error("Unsupported merge request URL: {0}")]
  UnsupportedHost(String),

  #[error("Invalid {0} URL format")]
  InvalidUrl(&'static str),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Anyhow error: {0}")]
  Anyhow(#[from] anyhow::Error)
}

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Default)]
pub struct Author {
  pub name:        String,
  pub username:    Option<String>,
  pub profile_url: Option<String>
}

/// One changed file within a merge request, as reported by the host.
#[derive(Debug, Clone, Default)]
pub struct FileChange {
  pub path:         String,
  pub diff:         String,
  pub new_content:  String,
  pub new_file:     bool,
  pub deleted_file: bool,
  pub renamed_file: bool
}

impl FileChange {
  pub fn status(&self) -> &'static str {
    if self.new_file {
      "added"
    } else if self.deleted_file {
      "deleted"
    } else if self.renamed_file {
      "renamed"
    } else {
      "modified"
    }
  }
}

/// Merge request metadata plus its diff, host-agnostic.
///
/// `diffs` is the multi-file unified diff blob (each file introduced by a
/// `diff --git` header) ready for `diff::parse_multi_file_diff` and
/// `diff::extract_file_chunks`.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
  pub id:          String,
  pub title:       String,
  pub description: String,
  pub author:      Author,
  pub web_url:     String,
  pub diffs:       String,
  pub changes:     Vec<FileChange>
}

#[async_trait]
pub trait Provider: std::fmt::Debug {
  async fn fetch_merge_request(&self, url: &str) -> Result<MergeRequest>;
  fn name(&self) -> &'static str;
}

/// Picks a provider from the URL's host.
pub fn detect(url: &str) -> Result<Box<dyn Provider>> {
  if url.contains("github.com") {
    Ok(Box::new(github::GitHub::new()))
  } else if url.contains("gitlab.com") {
    Ok(Box::new(gitlab::GitLab::new()))
  } else {
    Err(ProviderError::UnsupportedHost(url.to_string()))
  }
}

/// Prefixes a host-supplied per-file patch with the `diff --git` header the
/// diff parser segments on. GitHub and GitLab both return bare hunks.
pub(crate) fn with_file_header(path: &str, patch: &str) -> String {
  format!("diff --git a/{path} b/{path}\n{patch}")
}
