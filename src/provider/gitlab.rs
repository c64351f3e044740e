//! GitLab merge request provider.

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::config;
use crate::provider::http::Http;
use crate::provider::{with_file_header, Author, FileChange, MergeRequest, Provider, ProviderError, Result};

#[derive(Debug, Deserialize)]
struct MergeRequestChanges {
  iid:         u64,
  title:       Option<String>,
  description: Option<String>,
  web_url:     Option<String>,
  author:      Option<GitLabUser>,
  #[serde(default)]
  changes:     Vec<Change>,
  diff_refs:   Option<DiffRefs>
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
  name:     Option<String>,
  username: Option<String>,
  web_url:  Option<String>
}

#[derive(Debug, Deserialize)]
struct Change {
  old_path:     Option<String>,
  new_path:     Option<String>,
  diff:         String,
  #[serde(default)]
  new_file:     bool,
  #[serde(default)]
  deleted_file: bool,
  #[serde(default)]
  renamed_file: bool
}

#[derive(Debug, Deserialize)]
struct DiffRefs {
  head_sha: Option<String>
}

#[derive(Debug, Deserialize)]
struct FileContent {
  content: Option<String>
}

#[derive(Debug)]
pub struct GitLab {
  api_key: Option<String>,
  api_url: String
}

impl GitLab {
  pub fn new() -> Self {
    Self {
      api_key: config::APP.gitlab_api_key.clone(),
      api_url: config::APP
        .gitlab_api_url
        .clone()
        .unwrap_or_else(|| "https://gitlab.com/api/v4".to_string())
    }
  }

  fn headers(&self) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(key) = &self.api_key {
      if let Ok(value) = HeaderValue::from_str(key) {
        headers.insert("Private-Token", value);
      }
    }
    headers
  }

  /// Resolves `https://gitlab.com/{group}/{project}/-/merge_requests/{n}`
  /// to the URL-encoded project path and the MR iid.
  pub fn parse_merge_request_url(url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(url).map_err(|_| ProviderError::InvalidUrl("GitLab"))?;
    let path = parsed.path().trim_start_matches('/');

    let (project, iid) = path
      .split_once("/-/merge_requests/")
      .ok_or(ProviderError::InvalidUrl("GitLab"))?;
    if project.is_empty() || iid.is_empty() || !iid.chars().all(|c| c.is_ascii_digit()) {
      return Err(ProviderError::InvalidUrl("GitLab"));
    }

    Ok((project.replace('/', "%2F"), iid.to_string()))
  }

  /// Fetches the full content of a file at the given ref, empty on any
  /// failure: content is context for the reviewer, not a hard requirement.
  async fn file_content(&self, http: &Http, project: &str, path: &str, git_ref: &str) -> String {
    let encoded_path = path.replace('/', "%2F");
    let url = format!("{}/projects/{project}/repository/files/{encoded_path}", self.api_url);

    let content: FileContent = match http.get(&url, self.headers(), &[("ref", git_ref)]).await {
      Ok(content) => content,
      Err(err) => {
        log::debug!("GitLab file content error for {path}@{git_ref}: {err}");
        return String::new();
      }
    };

    let Some(encoded) = content.content else {
      return String::new();
    };
    let compact: String = encoded.split_whitespace().collect();

    match BASE64_STANDARD.decode(&compact) {
      Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
      Err(err) => {
        log::debug!("Undecodable content for {path}@{git_ref}: {err}");
        String::new()
      }
    }
  }
}

impl Default for GitLab {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Provider for GitLab {
  fn name(&self) -> &'static str {
    "GitLab"
  }

  async fn fetch_merge_request(&self, url: &str) -> Result<MergeRequest> {
    let http = Http::new()?;
    let (project, iid) = Self::parse_merge_request_url(url)?;

    log::info!("Fetching MR !{iid} data from project {project}...");
    let api_url = format!("{}/projects/{project}/merge_requests/{iid}/changes", self.api_url);
    let mr: MergeRequestChanges = http.get(&api_url, self.headers(), &[]).await?;

    let head_sha = mr
      .diff_refs
      .as_ref()
      .and_then(|refs| refs.head_sha.clone());

    let total = mr.changes.len();
    log::info!("Processing {total} changed files...");

    let mut changes = Vec::with_capacity(total);
    let mut diffs = Vec::new();

    for (i, change) in mr.changes.into_iter().enumerate() {
      let Some(path) = change.new_path.clone().or(change.old_path.clone()) else {
        continue;
      };

      log::info!("[{}/{total}] Loading content: {path}", i + 1);

      let new_content = match (&change.new_path, &head_sha) {
        (Some(new_path), Some(sha)) => self.file_content(&http, &project, new_path, sha).await,
        _ => String::new()
      };

      diffs.push(with_file_header(&path, &change.diff));

      changes.push(FileChange {
        path,
        diff: change.diff,
        new_content,
        new_file: change.new_file,
        deleted_file: change.deleted_file,
        renamed_file: change.renamed_file
      });
    }

    let author = mr
      .author
      .map(|user| Author {
        name:        user.name.or(user.username.clone()).unwrap_or_default(),
        username:    user.username,
        profile_url: user.web_url
      })
      .unwrap_or_default();

    Ok(MergeRequest {
      id: mr.iid.to_string(),
      title: mr.title.unwrap_or_default(),
      description: mr.description.unwrap_or_default(),
      author,
      web_url: mr.web_url.unwrap_or_default(),
      diffs: diffs.join("\n"),
      changes
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_changes_payload_mapping() {
    let payload = r#"{
      "iid": 8,
      "title": "Harden login",
      "description": "Adds validation.",
      "web_url": "https://gitlab.com/acme/app/-/merge_requests/8",
      "author": {"name": "Sasha", "username": "sasha", "web_url": "https://gitlab.com/sasha"},
      "changes": [
        {"old_path": "src/login.ts", "new_path": "src/login.ts", "diff": "@@ -1 +1 @@\n-a\n+b", "new_file": false, "deleted_file": false, "renamed_file": false}
      ],
      "diff_refs": {"base_sha": "000", "head_sha": "abc123"}
    }"#;

    let mr: MergeRequestChanges = serde_json::from_str(payload).unwrap();
    assert_eq!(mr.iid, 8);
    assert_eq!(mr.changes.len(), 1);
    assert_eq!(mr.changes[0].new_path.as_deref(), Some("src/login.ts"));
    assert_eq!(mr.diff_refs.unwrap().head_sha.as_deref(), Some("abc123"));
    assert_eq!(mr.author.unwrap().username.as_deref(), Some("sasha"));
  }

  #[test]
  fn test_changes_payload_defaults() {
    // Rename-only entries omit the boolean flags
    let payload = r#"{"iid": 1, "changes": [{"old_path": "a", "new_path": "b", "diff": ""}]}"#;
    let mr: MergeRequestChanges = serde_json::from_str(payload).unwrap();

    assert!(!mr.changes[0].new_file);
    assert!(!mr.changes[0].renamed_file);
  }

  #[test]
  fn test_parse_merge_request_url() {
    let (project, iid) = GitLab::parse_merge_request_url("https://gitlab.com/group/project/-/merge_requests/42").unwrap();
    assert_eq!(project, "group%2Fproject");
    assert_eq!(iid, "42");
  }

  #[test]
  fn test_parse_nested_group_url() {
    let (project, iid) = GitLab::parse_merge_request_url("https://gitlab.com/group/sub/project/-/merge_requests/7").unwrap();
    assert_eq!(project, "group%2Fsub%2Fproject");
    assert_eq!(iid, "7");
  }

  #[test]
  fn test_parse_rejects_malformed_urls() {
    assert!(GitLab::parse_merge_request_url("https://gitlab.com/group/project").is_err());
    assert!(GitLab::parse_merge_request_url("https://gitlab.com/group/project/-/merge_requests/abc").is_err());
    assert!(GitLab::parse_merge_request_url("nonsense").is_err());
  }
}
