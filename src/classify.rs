//! File-extension classification for code fence labels.

/// Extension of a file name, without the dot. Empty when there is none.
pub fn extension(path: &str) -> &str {
  path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Markdown fence language for a file, falling back to the lowercased
/// extension for anything the table does not know.
pub fn fence_language(path: &str) -> String {
  let ext = extension(path).to_ascii_lowercase();

  let known = match ext.as_str() {
    "ts" => "typescript",
    "js" => "javascript",
    "tsx" => "tsx",
    "jsx" => "jsx",
    "py" => "python",
    "rs" => "rust",
    "go" => "go",
    "java" => "java",
    "cpp" => "cpp",
    "c" => "c",
    "css" => "css",
    "scss" => "scss",
    "html" => "html",
    "xml" => "xml",
    "json" => "json",
    "yaml" | "yml" => "yaml",
    "md" => "markdown",
    "sql" => "sql",
    "sh" => "bash",
    "toml" => "toml",
    "dockerfile" => "dockerfile",
    _ => return ext
  };

  known.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extension() {
    assert_eq!(extension("src/main.rs"), "rs");
    assert_eq!(extension("archive.tar.gz"), "gz");
    assert_eq!(extension("Makefile"), "");
  }

  #[test]
  fn test_fence_language_known() {
    assert_eq!(fence_language("app.ts"), "typescript");
    assert_eq!(fence_language("config.YML"), "yaml");
    assert_eq!(fence_language("script.py"), "python");
  }

  #[test]
  fn test_fence_language_fallback() {
    assert_eq!(fence_language("query.kql"), "kql");
    assert_eq!(fence_language("LICENSE"), "");
  }
}
