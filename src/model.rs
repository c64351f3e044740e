use std::default::Default;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Mutex;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

use once_cell::sync::Lazy;
use anyhow::{bail, Result};
use tiktoken_rs::get_completion_max_tokens;
use tiktoken_rs::model::get_context_size;

use crate::profile;

// Token count cache using hash for keys
static TOKEN_CACHE: Lazy<Mutex<HashMap<u64, usize>>> = Lazy::new(|| Mutex::new(HashMap::with_capacity(1000)));

// Model identifiers
const MODEL_GPT4: &str = "gpt-4";
const MODEL_GPT4_OPTIMIZED: &str = "gpt-4o";
const MODEL_GPT4_MINI: &str = "gpt-4o-mini";
const MODEL_GPT4_TURBO: &str = "gpt-4-turbo-preview";
const MODEL_LLAMA2: &str = "llama2:latest";
const MODEL_CODELLAMA: &str = "codellama:latest";
const MODEL_MISTRAL: &str = "mistral:latest";

/// Represents the available AI models for review generation.
/// Each model has different capabilities and token limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
  /// Standard GPT-4 model
  GPT4,
  /// Optimized GPT-4 model for better performance
  GPT4o,
  /// GPT-4 Turbo model
  GPT4Turbo,
  /// Default model - Mini version of optimized GPT-4 for faster processing
  #[default]
  GPT4oMini,
  /// Llama 2 model served by Ollama
  Llama2,
  /// CodeLlama model optimized for code
  CodeLlama,
  /// Mistral model
  Mistral
}

impl Model {
  pub fn is_local(&self) -> bool {
    matches!(self, Model::Llama2 | Model::CodeLlama | Model::Mistral)
  }

  /// Counts the number of tokens in the given text
  pub fn count_tokens(&self, text: &str) -> Result<usize> {
    profile!("Count tokens");

    // For very short texts or Ollama models, use fast path
    if text.len() < 50 || self.is_local() {
      return Ok(self.estimate_tokens(text));
    }

    let cache_key = {
      let mut hasher = DefaultHasher::new();
      self.to_string().hash(&mut hasher);
      text.hash(&mut hasher);
      hasher.finish()
    };

    {
      let cache = TOKEN_CACHE.lock().unwrap();
      if let Some(&count) = cache.get(&cache_key) {
        return Ok(count);
      }
    }

    let count = self.count_tokens_internal(text)?;

    // Only cache if text is long enough to be worth it
    if text.len() > 100 {
      TOKEN_CACHE.lock().unwrap().insert(cache_key, count);
    }

    Ok(count)
  }

  fn count_tokens_internal(&self, text: &str) -> Result<usize> {
    let model_str: &str = self.into();
    Ok(
      self
        .context_size()
        .saturating_sub(get_completion_max_tokens(model_str, text)?)
    )
  }

  /// Byte-pair estimate for models tiktoken has no vocabulary for.
  #[inline]
  fn estimate_tokens(&self, text: &str) -> usize {
    let byte_len = text.len();
    if byte_len == 0 {
      return 0;
    }

    let utf8_overhead = text.chars().filter(|c| *c as u32 > 127).count() / 2;
    ((byte_len + utf8_overhead) as f64 * 0.4).max(1.0) as usize
  }

  /// Gets the maximum context size for the current model.
  pub fn context_size(&self) -> usize {
    profile!("Get context size");
    if self.is_local() {
      return 4096;
    }

    let model_str: &str = self.into();
    get_context_size(model_str)
  }

  /// Truncates the given text to fit within the specified token limit.
  pub fn truncate(&self, text: &str, max_tokens: usize) -> Result<String> {
    profile!("Truncate text");

    if self.count_tokens(text)? <= max_tokens {
      return Ok(text.to_string());
    }

    let lines: Vec<_> = text.lines().collect();
    let total_lines = lines.len();

    // Exponential search for a rough cut point, then binary search within it
    let mut size = 1;
    while size < total_lines && self.count_tokens(&lines[..size].join("\n"))? <= max_tokens {
      size *= 2;
    }

    let mut left = size / 2;
    let mut right = size.min(total_lines);

    while left < right {
      let mid = (left + right).div_ceil(2);
      let chunk = lines[..mid].join("\n");

      if self.count_tokens(&chunk)? <= max_tokens {
        left = mid;
      } else {
        right = mid - 1;
      }
    }

    Ok(lines[..left].join("\n"))
  }
}

impl From<&Model> for &str {
  fn from(model: &Model) -> Self {
    match model {
      Model::GPT4o => MODEL_GPT4_OPTIMIZED,
      Model::GPT4 => MODEL_GPT4,
      Model::GPT4Turbo => MODEL_GPT4_TURBO,
      Model::GPT4oMini => MODEL_GPT4_MINI,
      Model::Llama2 => MODEL_LLAMA2,
      Model::CodeLlama => MODEL_CODELLAMA,
      Model::Mistral => MODEL_MISTRAL
    }
  }
}

impl FromStr for Model {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim() {
      s if s.eq_ignore_ascii_case(MODEL_GPT4_OPTIMIZED) => Ok(Model::GPT4o),
      s if s.eq_ignore_ascii_case(MODEL_GPT4) => Ok(Model::GPT4),
      s if s.eq_ignore_ascii_case(MODEL_GPT4_TURBO) => Ok(Model::GPT4Turbo),
      s if s.eq_ignore_ascii_case(MODEL_GPT4_MINI) => Ok(Model::GPT4oMini),
      s if s.eq_ignore_ascii_case(MODEL_LLAMA2) => Ok(Model::Llama2),
      s if s.eq_ignore_ascii_case(MODEL_CODELLAMA) => Ok(Model::CodeLlama),
      s if s.eq_ignore_ascii_case(MODEL_MISTRAL) => Ok(Model::Mistral),
      model => bail!("Invalid model name: {}", model)
    }
  }
}

impl Display for Model {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", <&str>::from(self))
  }
}

// Conversion from string types to Model with fallback to default
impl From<&str> for Model {
  fn from(s: &str) -> Self {
    s.parse().unwrap_or_default()
  }
}

impl From<String> for Model {
  fn from(s: String) -> Self {
    s.as_str().into()
  }
}
