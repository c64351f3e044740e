//! Unified diff parsing.
//!
//! Converts the raw unified-diff text emitted by Git hosts into a
//! line-addressable change model. Removals and additions are reconciled
//! pairwise into replacements anchored at their line in the new file.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
  static ref FILE_HEADER: Regex = Regex::new(r"^diff --git a/(\S+) b/(\S+)").unwrap();
  static ref HUNK_HEADER: Regex = Regex::new(r"^@@ -(\d+),(\d+) \+(\d+),(\d+) @@").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiffError {
  #[error("invalid diff format: missing file header")]
  MissingFileHeader
}

/// One reconciled edit, anchored at its 1-based line in the new file.
///
/// `old` is absent for a pure insertion, `new` is absent for a pure
/// deletion. [`parse`] only returns changes where both sides are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
  pub line: u32,
  pub old:  Option<String>,
  pub new:  Option<String>
}

/// Parsed diff of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
  pub file:    String,
  pub changes: Vec<LineChange>
}

/// Raw per-file segment of a multi-file diff, header line included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
  pub file: String,
  pub diff: String
}

/// Parses the unified diff of exactly one file.
///
/// Empty or whitespace-only input yields `Ok(None)`. Input whose first
/// line is not a `diff --git a/<old> b/<new>` header fails with
/// [`DiffError::MissingFileHeader`].
///
/// Removals open a pending change; the next addition fills it, forming a
/// replacement. The pairing is strictly sequential with no lookahead:
/// consecutive `-` and `+` runs pair positionally in emission order, and a
/// context line between a removal and an addition does not close the open
/// removal. Pure insertions and deletions are filtered from the result.
pub fn parse(diff_text: &str) -> Result<Option<FileDiff>, DiffError> {
  if diff_text.trim().is_empty() {
    return Ok(None);
  }

  let file = diff_text
    .lines()
    .next()
    .and_then(|first| FILE_HEADER.captures(first))
    .map(|header| header[2].to_string())
    .ok_or(DiffError::MissingFileHeader)?;

  let mut changes: Vec<LineChange> = Vec::new();
  let mut old_line_no: Option<u32> = None;
  let mut new_line_no: Option<u32> = None;

  for line in diff_text.lines() {
    if let Some(hunk) = HUNK_HEADER.captures(line) {
      old_line_no = Some(hunk[1].parse().expect("hunk header out of range"));
      new_line_no = Some(hunk[3].parse().expect("hunk header out of range"));
      continue;
    }

    if line.starts_with("+++") || line.starts_with("---") || line.starts_with("diff --git") || line.starts_with("index ") {
      continue;
    }

    // Counters are unset until the first hunk header
    let (Some(old_no), Some(new_no)) = (old_line_no, new_line_no) else {
      continue;
    };

    if let Some(removed) = line.strip_prefix('-') {
      changes.push(LineChange {
        line: new_no,
        old:  Some(removed.to_string()),
        new:  None
      });
      old_line_no = Some(old_no + 1);
    } else if let Some(added) = line.strip_prefix('+') {
      match changes.last_mut() {
        Some(open) if open.new.is_none() => open.new = Some(added.to_string()),
        _ => changes.push(LineChange {
          line: new_no,
          old:  None,
          new:  Some(added.to_string())
        })
      }
      new_line_no = Some(new_no + 1);
    } else {
      old_line_no = Some(old_no + 1);
      new_line_no = Some(new_no + 1);
    }
  }

  changes.retain(|change| change.old.is_some() && change.new.is_some());

  Ok(Some(FileDiff { file, changes }))
}

/// Parses a diff blob containing several concatenated single-file diffs.
///
/// The blob is split on `diff --git` header lines and each segment is
/// parsed independently. Segments the single-file parser rejects (for
/// example a rename-only entry with no hunks) are dropped rather than
/// failing the whole blob; output order matches input order.
pub fn parse_multi_file_diff(diff_text: &str) -> Vec<FileDiff> {
  if diff_text.trim().is_empty() {
    return Vec::new();
  }

  let mut files = Vec::new();
  let mut segment: Vec<&str> = Vec::new();

  for line in diff_text.lines() {
    if line.starts_with("diff --git") && !segment.is_empty() {
      if let Ok(Some(file_diff)) = parse(&segment.join("\n")) {
        files.push(file_diff);
      }
      segment.clear();
    }
    segment.push(line);
  }

  if !segment.is_empty() {
    if let Ok(Some(file_diff)) = parse(&segment.join("\n")) {
      files.push(file_diff);
    }
  }

  files
}

/// Splits a multi-file diff blob into raw per-file chunks.
///
/// Segmentation matches [`parse_multi_file_diff`], but the segment text is
/// kept verbatim, hunk headers and metadata included. Reviewers get the
/// exact diff the host produced, not the filtered change model. A header
/// whose file name cannot be extracted yields the `"unknown"` sentinel.
pub fn extract_file_chunks(diff_text: &str) -> Vec<RawChunk> {
  if diff_text.trim().is_empty() {
    return Vec::new();
  }

  let mut chunks = Vec::new();
  let mut current: Vec<&str> = Vec::new();
  let mut current_file: Option<String> = None;

  for line in diff_text.lines() {
    if line.starts_with("diff --git") {
      if let Some(file) = current_file.take() {
        if !current.is_empty() {
          chunks.push(RawChunk { file, diff: current.join("\n") });
        }
      }

      current_file = Some(
        FILE_HEADER
          .captures(line)
          .map(|header| header[2].to_string())
          .unwrap_or_else(|| "unknown".to_string())
      );
      current = vec![line];
    } else {
      current.push(line);
    }
  }

  if let Some(file) = current_file {
    if !current.is_empty() {
      chunks.push(RawChunk { file, diff: current.join("\n") });
    }
  }

  chunks
}
