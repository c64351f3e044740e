//! LLM-backed code reviewers.
//!
//! A [`Reviewer`] turns per-file review contexts into free-text commentary
//! and a global summary. The review loop is sequential: each file costs one
//! completion and the providers are rate- and context-sensitive.

pub mod ollama;
pub mod openai;

use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use crate::model::Model;
use crate::provider::{FileChange, MergeRequest};
use crate::{diff, profile};

/// Reply reviewers are instructed to give when there is nothing to flag;
/// files whose commentary contains it are left out of the report.
pub const LGTM: &str = "LGTM, nothing to flag";

const NO_ISSUES_SUMMARY: &str = "No significant issues found in this change set.";

const SYSTEM_PROMPT: &str = "You are a senior software engineer performing a code review. Your feedback is \
constructive, polite and specific.

You are given unified diffs. Lines starting with '-' are the state BEFORE the \
change, lines starting with '+' are the state AFTER. Treat each '-'/'+' pair \
as one edit and judge the resulting code, not the act of changing it. Never \
recommend an edit that is already present in the '+' lines.

Base the review on five pillars:
1. FUNC: logic errors, error handling, runtime failures.
2. ARCH: SOLID/DRY violations, coupling, design patterns.
3. STYLE: naming, complexity, magic numbers, comments.
4. INFRA: performance, resource management, deployment.
5. SEC: injections, XSS, unsafe file paths, permissions.

Group findings by priority (CRITICAL, HIGH, MEDIUM, LOW) and format each as:
[<pillar>][<priority>] <file>:<line> - <problem> - <suggested fix>

Write tersely, no emoji, Markdown formatting only. If there are no \
substantial issues reply exactly: \"LGTM, nothing to flag.\"";

const SUMMARY_PROMPT: &str = "Based on the review findings below, write a closing summary in Markdown:

## Status: APPROVED | REQUEST_CHANGES | COMMENT

## Main findings per pillar (FUNC, ARCH, STYLE, INFRA, SEC): one line each

## What was done well: short list

## Key recommendations: short list

Write tersely and without emoji.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
  Added,
  Deleted,
  Modified
}

impl From<&FileChange> for ChangeKind {
  fn from(change: &FileChange) -> Self {
    if change.new_file {
      ChangeKind::Added
    } else if change.deleted_file {
      ChangeKind::Deleted
    } else {
      ChangeKind::Modified
    }
  }
}

/// Commentary the reviewer produced for a single file.
#[derive(Debug, Clone)]
pub struct FileReview {
  pub file:        String,
  pub diff:        String,
  pub comments:    String,
  pub new_content: String,
  pub kind:        ChangeKind
}

#[derive(Debug, Clone, Default)]
pub struct Review {
  pub summary:      String,
  pub file_reviews: Vec<FileReview>
}

#[async_trait]
pub trait Reviewer: Send + Sync {
  async fn review_file(&self, context: &str) -> Result<String>;
  async fn summarize(&self, comments: &str) -> Result<String>;
  fn name(&self) -> String;
}

/// Builds the reviewer for the configured model: Ollama-served models get
/// the local client, everything else goes through the OpenAI-compatible
/// endpoint.
pub fn create(model: Model) -> Box<dyn Reviewer> {
  if model.is_local() {
    Box::new(ollama::OllamaReviewer::new(model))
  } else {
    Box::new(openai::OpenAiReviewer::new(model))
  }
}

/// Assembles the per-file prompt context: path, change kind, surrounding
/// file content where it exists, and the raw diff.
pub fn context_for(change: &FileChange) -> String {
  let mut parts = Vec::new();

  match ChangeKind::from(change) {
    ChangeKind::Added => {
      parts.push(format!("New file: `{}`", change.path));
      if !change.new_content.is_empty() {
        parts.push(format!("\nContents of the new file:\n```\n{}\n```", change.new_content));
      }
    }
    ChangeKind::Deleted => {
      parts.push(format!("Deleted file: `{}`", change.path));
      parts.push(format!("\nDeletion diff:\n```diff\n{}\n```", change.diff));
    }
    ChangeKind::Modified => {
      parts.push(format!("Modified file: `{}`", change.path));
      if !change.new_content.is_empty() {
        parts.push(format!("\nCurrent state of the file (AFTER the change):\n```\n{}\n```", change.new_content));
      }
      parts.push(format!("\nThe actual changes:\n```diff\n{}\n```", change.diff));
      parts.push("\nIMPORTANT: analyze only the changes shown in the diff above. Use the full file only to understand context.".to_string());
    }
  }

  parts.join("\n")
}

/// Reviews every changed file sequentially, then asks for a global summary.
///
/// A per-file reviewer failure is logged and skipped; one broken completion
/// must not void the rest of the report.
pub async fn review(reviewer: &dyn Reviewer, mr: &MergeRequest) -> Result<Review> {
  profile!("Review merge request");

  let changes = review_targets(mr);
  log::info!("Starting AI analysis of {} files...", changes.len());

  let pb = ProgressBar::new(changes.len() as u64);
  pb.set_style(
    ProgressStyle::default_bar()
      .template("{bar:30.cyan/blue} {pos}/{len} {msg}")
      .context("Failed to create progress bar style")?
  );

  let mut file_reviews = Vec::new();
  let mut all_comments = Vec::new();

  for change in &changes {
    pb.set_message(change.path.rsplit('/').next().unwrap_or(&change.path).to_string());

    match reviewer.review_file(&context_for(change)).await {
      Ok(comments) => {
        let comments = comments.trim().to_string();
        if !comments.is_empty() && !comments.contains(LGTM) {
          log::debug!("Found comments for {}", change.path);
          all_comments.push(comments.clone());
          file_reviews.push(FileReview {
            file:        change.path.clone(),
            diff:        change.diff.clone(),
            comments,
            new_content: change.new_content.clone(),
            kind:        ChangeKind::from(change)
          });
        }
      }
      // An auth failure will fail every remaining call identically
      Err(err) if crate::error::is_auth_error(&err) => {
        pb.finish_and_clear();
        return Err(err);
      }
      Err(err) => log::error!("File analysis error for {}: {err}", change.path)
    }

    pb.inc(1);
  }
  pb.finish_and_clear();

  log::info!("Building overall summary...");
  let summary = if all_comments.is_empty() {
    NO_ISSUES_SUMMARY.to_string()
  } else {
    match reviewer.summarize(&all_comments.join("\n")).await {
      Ok(summary) => summary,
      Err(err) => {
        log::debug!("Summary build error: {err}");
        String::new()
      }
    }
  };

  Ok(Review { summary, file_reviews })
}

/// Providers that return per-file changes are used as-is; a provider that
/// only produced a concatenated diff blob gets segmented into raw per-file
/// chunks instead.
fn review_targets(mr: &MergeRequest) -> Vec<FileChange> {
  if !mr.changes.is_empty() {
    return mr.changes.clone();
  }

  diff::extract_file_chunks(&mr.diffs)
    .into_iter()
    .map(|chunk| FileChange {
      path: chunk.file,
      diff: chunk.diff,
      ..Default::default()
    })
    .collect()
}
