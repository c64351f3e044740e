//! GitHub pull request provider.

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use crate::config;
use crate::provider::http::Http;
use crate::provider::{with_file_header, Author, FileChange, MergeRequest, Provider, ProviderError, Result};

#[derive(Debug, Deserialize)]
struct PullRequest {
  number:   u64,
  title:    Option<String>,
  body:     Option<String>,
  html_url: Option<String>,
  user:     Option<User>,
  head:     Option<Head>
}

#[derive(Debug, Deserialize)]
struct User {
  login:    String,
  html_url: Option<String>
}

#[derive(Debug, Deserialize)]
struct Head {
  sha: String
}

#[derive(Debug, Deserialize)]
struct PullRequestFile {
  filename: String,
  status:   String,
  patch:    Option<String>
}

#[derive(Debug, Deserialize)]
struct Contents {
  content: Option<String>
}

#[derive(Debug)]
pub struct GitHub {
  api_key: Option<String>,
  api_url: String
}

impl GitHub {
  pub fn new() -> Self {
    Self {
      api_key: config::APP.github_api_key.clone(),
      api_url: config::APP
        .github_api_url
        .clone()
        .unwrap_or_else(|| "https://api.github.com".to_string())
    }
  }

  fn headers(&self) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(key) = &self.api_key {
      if let Ok(value) = HeaderValue::from_str(&format!("token {key}")) {
        headers.insert(AUTHORIZATION, value);
      }
    }
    headers
  }

  /// Resolves both web and API URL shapes to `(owner/repo, number)`:
  /// `https://github.com/{owner}/{repo}/pull/{n}` and
  /// `https://api.github.com/repos/{owner}/{repo}/pulls/{n}`.
  pub fn parse_pull_url(url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(url).map_err(|_| ProviderError::InvalidUrl("GitHub"))?;
    let segments: Vec<&str> = parsed
      .path_segments()
      .map(|segments| segments.filter(|s| !s.is_empty()).collect())
      .unwrap_or_default();

    match segments.as_slice() {
      [owner, repo, "pull", number] => Ok((format!("{owner}/{repo}"), number.to_string())),
      ["repos", owner, repo, "pulls", number] => Ok((format!("{owner}/{repo}"), number.to_string())),
      _ => Err(ProviderError::InvalidUrl("GitHub"))
    }
  }

  async fn file_content(&self, http: &Http, repo: &str, path: &str, git_ref: &str) -> Option<String> {
    let url = format!("{}/repos/{repo}/contents/{path}", self.api_url);

    let contents: Contents = match http.get(&url, self.headers(), &[("ref", git_ref)]).await {
      Ok(contents) => contents,
      Err(err) => {
        log::warn!("Error loading content for {path}: {err}");
        return None;
      }
    };

    let encoded: String = contents.content?.split_whitespace().collect();
    match BASE64_STANDARD.decode(&encoded) {
      Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
      Err(err) => {
        log::warn!("Undecodable content for {path}: {err}");
        None
      }
    }
  }
}

impl Default for GitHub {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Provider for GitHub {
  fn name(&self) -> &'static str {
    "GitHub"
  }

  async fn fetch_merge_request(&self, url: &str) -> Result<MergeRequest> {
    let http = Http::new()?;
    let (repo, number) = Self::parse_pull_url(url)?;

    log::info!("Fetching PR #{number} data from repository {repo}...");
    let api_url = format!("{}/repos/{repo}/pulls/{number}", self.api_url);
    let pr: PullRequest = http.get(&api_url, self.headers(), &[]).await?;

    log::info!("Fetching list of changed files...");
    let files: Vec<PullRequestFile> = match http.get(&format!("{api_url}/files"), self.headers(), &[]).await {
      Ok(files) => files,
      Err(err) => {
        log::warn!("Failed to fetch files: {err}");
        Vec::new()
      }
    };
    log::info!("Received {} changed files", files.len());

    let head_sha = pr
      .head
      .as_ref()
      .map(|head| head.sha.clone())
      .unwrap_or_else(|| "HEAD".to_string());

    let total = files.len();
    let mut changes = Vec::with_capacity(total);
    let mut diffs = Vec::new();

    for (i, file) in files.into_iter().enumerate() {
      log::info!("[{}/{total}] Loading content: {}", i + 1, file.filename);

      let removed = file.status == "removed";
      let new_content = if removed {
        String::new()
      } else {
        self
          .file_content(&http, &repo, &file.filename, &head_sha)
          .await
          .unwrap_or_default()
      };

      let patch = file.patch.unwrap_or_default();
      if !patch.is_empty() {
        diffs.push(with_file_header(&file.filename, &patch));
      }

      changes.push(FileChange {
        path: file.filename,
        diff: patch,
        new_content,
        new_file: file.status == "added",
        deleted_file: removed,
        renamed_file: file.status == "renamed"
      });
    }

    let author = pr
      .user
      .map(|user| Author {
        name:        user.login.clone(),
        username:    Some(user.login),
        profile_url: user.html_url
      })
      .unwrap_or_default();

    Ok(MergeRequest {
      id: pr.number.to_string(),
      title: pr.title.unwrap_or_default(),
      description: pr.body.unwrap_or_default(),
      author,
      web_url: pr.html_url.unwrap_or_default(),
      diffs: diffs.join("\n"),
      changes
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pull_request_payload_mapping() {
    let payload = r#"{
      "number": 42,
      "title": "Add login form",
      "body": "Implements the login form.",
      "html_url": "https://github.com/acme/app/pull/42",
      "user": {"login": "jordan", "html_url": "https://github.com/jordan"},
      "head": {"sha": "abc123"}
    }"#;

    let pr: PullRequest = serde_json::from_str(payload).unwrap();
    assert_eq!(pr.number, 42);
    assert_eq!(pr.title.as_deref(), Some("Add login form"));
    assert_eq!(pr.user.unwrap().login, "jordan");
    assert_eq!(pr.head.unwrap().sha, "abc123");
  }

  #[test]
  fn test_file_payload_without_patch() {
    // Binary files come back without a patch field
    let payload = r#"{"filename": "logo.png", "status": "added"}"#;
    let file: PullRequestFile = serde_json::from_str(payload).unwrap();

    assert_eq!(file.filename, "logo.png");
    assert_eq!(file.status, "added");
    assert!(file.patch.is_none());
  }

  #[test]
  fn test_parse_web_url() {
    let (repo, number) = GitHub::parse_pull_url("https://github.com/rust-lang/rust/pull/1234").unwrap();
    assert_eq!(repo, "rust-lang/rust");
    assert_eq!(number, "1234");
  }

  #[test]
  fn test_parse_api_url() {
    let (repo, number) = GitHub::parse_pull_url("https://api.github.com/repos/rust-lang/rust/pulls/1234").unwrap();
    assert_eq!(repo, "rust-lang/rust");
    assert_eq!(number, "1234");
  }

  #[test]
  fn test_parse_rejects_non_pull_urls() {
    assert!(GitHub::parse_pull_url("https://github.com/rust-lang/rust").is_err());
    assert!(GitHub::parse_pull_url("https://github.com/rust-lang/rust/issues/5").is_err());
    assert!(GitHub::parse_pull_url("not a url").is_err());
  }
}
