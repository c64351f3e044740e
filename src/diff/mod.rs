//! Diff processing and parsing utilities.
//!
//! This module handles parsing unified diffs into structured data
//! and provides utilities for working with diff content.

pub mod parser;

pub use parser::{extract_file_chunks, parse, parse_multi_file_diff, DiffError, FileDiff, LineChange, RawChunk};
