use anyhow::{anyhow, Result};
use async_trait::async_trait;

use review::provider::{Author, FileChange, MergeRequest};
use review::reviewer::{self, ChangeKind, Reviewer, LGTM};
use review::{diff, report};

/// Scripted reviewer: returns canned commentary per file, no network.
struct ScriptedReviewer {
  fail_on: Option<&'static str>
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
  fn name(&self) -> String {
    "Scripted".to_string()
  }

  async fn review_file(&self, context: &str) -> Result<String> {
    if let Some(needle) = self.fail_on {
      if context.contains(needle) {
        return Err(anyhow!("completion timed out"));
      }
    }

    if context.contains("clean.rs") {
      Ok(format!("{LGTM}."))
    } else {
      Ok("[FUNC][HIGH] src/login.ts:3 - missing null check - add a guard".to_string())
    }
  }

  async fn summarize(&self, comments: &str) -> Result<String> {
    Ok(format!("## Status: REQUEST_CHANGES\n\n{} finding(s)", comments.lines().count()))
  }
}

fn merge_request() -> MergeRequest {
  MergeRequest {
    id: "9".to_string(),
    title: "Harden login".to_string(),
    description: "Adds validation.".to_string(),
    author: Author {
      name: "Sasha".to_string(),
      username: Some("sasha".to_string()),
      profile_url: None
    },
    web_url: "https://gitlab.com/acme/app/-/merge_requests/9".to_string(),
    diffs: String::new(),
    changes: vec![
      FileChange {
        path: "src/login.ts".to_string(),
        diff: "diff --git a/src/login.ts b/src/login.ts\n@@ -1,2 +1,2 @@\n-let user;\n+const user = null;".to_string(),
        ..Default::default()
      },
      FileChange {
        path: "src/clean.rs".to_string(),
        diff: "diff --git a/src/clean.rs b/src/clean.rs\n@@ -1,1 +1,1 @@\n-a\n+b".to_string(),
        ..Default::default()
      },
    ]
  }
}

#[tokio::test]
async fn test_review_skips_files_without_findings() {
  let reviewer = ScriptedReviewer { fail_on: None };
  let review = reviewer::review(&reviewer, &merge_request()).await.unwrap();

  assert_eq!(review.file_reviews.len(), 1);
  assert_eq!(review.file_reviews[0].file, "src/login.ts");
  assert_eq!(review.file_reviews[0].kind, ChangeKind::Modified);
  assert!(review.summary.starts_with("## Status: REQUEST_CHANGES"));
}

#[tokio::test]
async fn test_review_survives_per_file_failures() {
  let reviewer = ScriptedReviewer { fail_on: Some("login.ts") };
  let review = reviewer::review(&reviewer, &merge_request()).await.unwrap();

  // login.ts errored, clean.rs said LGTM: nothing reviewable remains
  assert!(review.file_reviews.is_empty());
  assert_eq!(review.summary, "No significant issues found in this change set.");
}

#[tokio::test]
async fn test_review_from_raw_diff_blob() {
  // No per-file changes from the provider, only a concatenated diff
  let mr = MergeRequest {
    diffs: "diff --git a/src/login.ts b/src/login.ts\n@@ -1,2 +1,2 @@\n-let user;\n+const user = null;".to_string(),
    ..Default::default()
  };

  let reviewer = ScriptedReviewer { fail_on: None };
  let review = reviewer::review(&reviewer, &mr).await.unwrap();

  assert_eq!(review.file_reviews.len(), 1);
  assert_eq!(review.file_reviews[0].file, "src/login.ts");
}

#[tokio::test]
async fn test_report_written_to_disk_is_intact() {
  let mr = merge_request();
  let reviewer = ScriptedReviewer { fail_on: None };
  let review = reviewer::review(&reviewer, &mr).await.unwrap();

  let out_dir = tempfile::TempDir::new().unwrap();
  let out_path = out_dir.path().join("review-20260101-000000-UTC.md");
  std::fs::write(&out_path, report::render(&mr, &review)).unwrap();

  let rendered = std::fs::read_to_string(&out_path).unwrap();
  assert!(rendered.contains("## 📝 Title: Harden login"));
  assert!(rendered.ends_with('\n'));
}

#[tokio::test]
async fn test_rendered_report_round_trip() {
  let mr = merge_request();
  let reviewer = ScriptedReviewer { fail_on: None };
  let review = reviewer::review(&reviewer, &mr).await.unwrap();

  let rendered = report::render(&mr, &review);

  assert!(rendered.contains("## 📝 Title: Harden login"));
  assert!(rendered.contains("### 1. `src/login.ts`"));
  assert!(rendered.contains("missing null check"));
  assert!(rendered.ends_with('\n'));

  // The diff embedded in the report is still parseable by the core parser
  let parsed = diff::parse(&review.file_reviews[0].diff).unwrap().unwrap();
  assert_eq!(parsed.file, "src/login.ts");
  assert_eq!(parsed.changes.len(), 1);
  assert_eq!(parsed.changes[0].line, 1);
}
