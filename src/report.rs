//! Markdown report rendering.
//!
//! Pure formatting over the provider's merge request record and the
//! reviewer's output; no awareness of how either was produced.

use crate::classify;
use crate::provider::{Author, MergeRequest};
use crate::reviewer::{ChangeKind, Review};

// Full file content is only inlined for small new files
const MAX_INLINE_CONTENT: usize = 2000;

fn format_author(author: &Author) -> String {
  match (&author.name, &author.username, &author.profile_url) {
    (name, Some(username), Some(url)) if !name.is_empty() => format!("**{name}** ([@{username}]({url}))"),
    (name, Some(username), None) if !name.is_empty() => format!("**{name}** (@{username})"),
    (_, Some(username), Some(url)) => format!("[@{username}]({url})"),
    (_, Some(username), None) => format!("@{username}"),
    (name, None, _) if !name.is_empty() => format!("**{name}**"),
    _ => "Unknown".to_string()
  }
}

/// Renders the final Markdown report, trailing newline included.
pub fn render(mr: &MergeRequest, review: &Review) -> String {
  let title = if mr.title.is_empty() {
    "No Title"
  } else {
    &mr.title
  };

  let mut lines = vec![format!("## 📝 Title: {title}"), format!("## 👤 Author: {}", format_author(&mr.author))];

  if !mr.web_url.is_empty() && !mr.id.is_empty() {
    lines.push(format!("## 🔗 Merge Request: [#{}]({})", mr.id, mr.web_url));
  } else if !mr.web_url.is_empty() {
    lines.push(format!("## 🔗 Link: [View PR/MR]({})", mr.web_url));
  }

  if !mr.description.trim().is_empty() {
    lines.push("## 📋 Description:".to_string());
    lines.push(mr.description.trim().to_string());
  }

  if !review.summary.is_empty() {
    lines.push("\n## Review summary".to_string());
    lines.push(review.summary.trim().to_string());
  }

  if review.file_reviews.is_empty() {
    lines.push("\n### Changes:".to_string());
    if mr.changes.is_empty() {
      lines.push("No changes detected.".to_string());
    } else {
      lines.extend(mr.changes.iter().map(|c| format!("- {}: {}", c.path, c.status())));
    }
    return lines.join("\n") + "\n";
  }

  lines.push("\n## File-by-file analysis".to_string());

  for (i, file_review) in review.file_reviews.iter().enumerate() {
    lines.push(format!("\n### {}. `{}`", i + 1, file_review.file));

    lines.push(
      match file_review.kind {
        ChangeKind::Added => "New file",
        ChangeKind::Deleted => "Deleted file",
        ChangeKind::Modified => "Modified file"
      }
      .to_string()
    );

    lines.push("\nChanges:".to_string());
    lines.push("```diff".to_string());
    lines.push(file_review.diff.clone());
    lines.push("```".to_string());

    if file_review.kind == ChangeKind::Added
      && !file_review.new_content.is_empty()
      && file_review.new_content.len() < MAX_INLINE_CONTENT
    {
      lines.push("\nFull contents of the file:".to_string());
      lines.push(format!("```{}", classify::fence_language(&file_review.file)));
      lines.push(file_review.new_content.clone());
      lines.push("```".to_string());
    }

    if !file_review.comments.is_empty() {
      lines.push("\nAnalysis:".to_string());
      lines.push(file_review.comments.clone());
    }

    lines.push("\n---".to_string());
  }

  lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::FileChange;
  use crate::reviewer::FileReview;

  fn merge_request() -> MergeRequest {
    MergeRequest {
      id: "42".to_string(),
      title: "Add login form".to_string(),
      description: "Implements the login form.".to_string(),
      author: Author {
        name:        "Jordan".to_string(),
        username:    Some("jordan".to_string()),
        profile_url: Some("https://github.com/jordan".to_string())
      },
      web_url: "https://github.com/acme/app/pull/42".to_string(),
      diffs: String::new(),
      changes: vec![FileChange {
        path: "src/login.ts".to_string(),
        ..Default::default()
      }]
    }
  }

  #[test]
  fn test_render_header_and_summary() {
    let review = Review {
      summary: "## Status: APPROVED".to_string(),
      file_reviews: Vec::new()
    };

    let report = render(&merge_request(), &review);

    assert!(report.starts_with("## 📝 Title: Add login form"));
    assert!(report.contains("## 👤 Author: **Jordan** ([@jordan](https://github.com/jordan))"));
    assert!(report.contains("## 🔗 Merge Request: [#42](https://github.com/acme/app/pull/42)"));
    assert!(report.contains("## Review summary"));
    assert!(report.ends_with('\n'));
  }

  #[test]
  fn test_render_change_listing_without_reviews() {
    let report = render(&merge_request(), &Review::default());
    assert!(report.contains("### Changes:"));
    assert!(report.contains("- src/login.ts: modified"));
  }

  #[test]
  fn test_render_file_review_section() {
    let review = Review {
      summary: "summary".to_string(),
      file_reviews: vec![FileReview {
        file:        "src/login.ts".to_string(),
        diff:        "diff --git a/src/login.ts b/src/login.ts\n+added".to_string(),
        comments:    "[FUNC][HIGH] src/login.ts:3 - missing null check - add a guard".to_string(),
        new_content: String::new(),
        kind:        ChangeKind::Modified
      }]
    };

    let report = render(&merge_request(), &review);

    assert!(report.contains("### 1. `src/login.ts`"));
    assert!(report.contains("Modified file"));
    assert!(report.contains("```diff"));
    assert!(report.contains("missing null check"));
  }

  #[test]
  fn test_render_inlines_small_new_files() {
    let review = Review {
      summary: "summary".to_string(),
      file_reviews: vec![FileReview {
        file:        "src/util.py".to_string(),
        diff:        "diff --git a/src/util.py b/src/util.py\n+def f(): pass".to_string(),
        comments:    "fine".to_string(),
        new_content: "def f(): pass\n".to_string(),
        kind:        ChangeKind::Added
      }]
    };

    let report = render(&merge_request(), &review);

    assert!(report.contains("Full contents of the file:"));
    assert!(report.contains("```python"));
  }

  #[test]
  fn test_render_skips_large_new_files() {
    let review = Review {
      summary: "summary".to_string(),
      file_reviews: vec![FileReview {
        file:        "src/big.py".to_string(),
        diff:        "diff".to_string(),
        comments:    "fine".to_string(),
        new_content: "x".repeat(MAX_INLINE_CONTENT),
        kind:        ChangeKind::Added
      }]
    };

    assert!(!render(&merge_request(), &review).contains("Full contents of the file:"));
  }

  #[test]
  fn test_format_author_fallbacks() {
    assert_eq!(format_author(&Author::default()), "Unknown");
    assert_eq!(
      format_author(&Author {
        name: "Sam".to_string(),
        ..Default::default()
      }),
      "**Sam**"
    );
    assert_eq!(
      format_author(&Author {
        name: String::new(),
        username: Some("sam".to_string()),
        profile_url: None
      }),
      "@sam"
    );
  }
}
