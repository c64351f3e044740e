use std::sync::atomic::{AtomicUsize, Ordering};

use async_openai::types::{ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::config::OpenAIConfig;
use async_openai::Client;
use async_openai::error::OpenAIError;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use colored::*;

use crate::{config, profile};
use crate::model::Model;
use crate::reviewer::{Reviewer, SUMMARY_PROMPT, SYSTEM_PROMPT};

const BUFFER_TOKENS: usize = 2048;
const MAX_ATTEMPTS: usize = 3;

// Aggregated across every completion in the process; reported once at exit
static PROMPT_TOKENS: AtomicUsize = AtomicUsize::new(0);
static COMPLETION_TOKENS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  pub response: String
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  pub prompt:     String,
  pub system:     String,
  pub max_tokens: u16,
  pub model:      Model
}

/// Reviewer backed by any OpenAI-compatible chat completion endpoint.
pub struct OpenAiReviewer {
  model: Model
}

impl OpenAiReviewer {
  pub fn new(model: Model) -> Self {
    Self { model }
  }
}

#[async_trait]
impl Reviewer for OpenAiReviewer {
  fn name(&self) -> String {
    format!("OpenAI-compatible ({})", self.model)
  }

  async fn review_file(&self, context: &str) -> Result<String> {
    let response = call(Request {
      system:     SYSTEM_PROMPT.to_string(),
      prompt:     format!("Review the following code changes:\n\n{context}"),
      max_tokens: config::APP.max_tokens.unwrap_or(2024) as u16,
      model:      self.model
    })
    .await?;

    Ok(response.response.trim().to_string())
  }

  async fn summarize(&self, comments: &str) -> Result<String> {
    let response = call(Request {
      system:     SYSTEM_PROMPT.to_string(),
      prompt:     format!("{SUMMARY_PROMPT}\n\nFindings:\n{comments}"),
      max_tokens: config::APP.max_tokens.unwrap_or(2024) as u16,
      model:      self.model
    })
    .await?;

    Ok(response.response.trim().to_string())
  }
}

/// Returns `(prompt_tokens, completion_tokens)` accumulated so far.
pub fn usage() -> (usize, usize) {
  (PROMPT_TOKENS.load(Ordering::Relaxed), COMPLETION_TOKENS.load(Ordering::Relaxed))
}

fn truncate_to_fit(text: &str, max_tokens: usize, model: &Model) -> Result<String> {
  let token_count = model.count_tokens(text)?;
  if token_count <= max_tokens {
    return Ok(text.to_string());
  }

  let lines: Vec<&str> = text.lines().collect();

  // Try increasingly aggressive truncation until we fit
  for attempt in 0..MAX_ATTEMPTS {
    let portion_size = match attempt {
      0 => lines.len() / 8,  // First try: Keep 25% (12.5% each end)
      1 => lines.len() / 12, // Second try: Keep ~16% (8% each end)
      _ => lines.len() / 20  // Final try: Keep 10% (5% each end)
    };

    let mut truncated = Vec::new();
    truncated.extend(lines.iter().take(portion_size));
    truncated.push("... (truncated for length) ...");
    truncated.extend(lines.iter().rev().take(portion_size).rev());

    let result = truncated.join("\n");
    let new_token_count = model.count_tokens(&result)?;

    if new_token_count <= max_tokens {
      return Ok(result);
    }
  }

  // If all attempts failed, return a minimal version
  let mut minimal = Vec::new();
  minimal.extend(lines.iter().take(lines.len() / 50));
  minimal.push("... (severely truncated for length) ...");
  minimal.extend(lines.iter().rev().take(lines.len() / 50).rev());
  Ok(minimal.join("\n"))
}

pub async fn call(request: Request) -> Result<Response> {
  profile!("OpenAI API call");
  let api_key = config::APP.openai_api_key.clone().context(format!(
    "{} OpenAI API key not found.\n    Run: {}",
    "ERROR:".bold().bright_red(),
    "review-ai config set openai-api-key <your-key>".yellow()
  ))?;

  let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
  if let Some(base_url) = config::APP.openai_base_url.clone() {
    openai_config = openai_config.with_api_base(base_url);
  }
  let client = Client::with_config(openai_config);

  // Calculate available tokens for content
  let system_tokens = request.model.count_tokens(&request.system)?;
  let available_tokens = request
    .model
    .context_size()
    .saturating_sub(system_tokens + BUFFER_TOKENS + request.max_tokens as usize);

  // Truncate prompt if needed
  let truncated_prompt = truncate_to_fit(&request.prompt, available_tokens, &request.model)?;

  let request = CreateChatCompletionRequestArgs::default()
    .max_tokens(request.max_tokens)
    .model(request.model.to_string())
    .messages([
      ChatCompletionRequestSystemMessageArgs::default()
        .content(request.system)
        .build()?
        .into(),
      ChatCompletionRequestUserMessageArgs::default()
        .content(truncated_prompt)
        .build()?
        .into()
    ])
    .build()?;

  {
    profile!("OpenAI request/response");
    let response = match client.chat().create(request).await {
      Ok(response) => response,
      Err(err) => {
        let error_msg = match err {
          OpenAIError::ApiError(e) =>
            format!(
              "{} {}\n    {}\n\nDetails:\n    {}\n\nSuggested Actions:\n    1. {}\n    2. {}\n    3. {}",
              "ERROR:".bold().bright_red(),
              "OpenAI API error:".bright_white(),
              e.message.dimmed(),
              "Failed to create chat completion.".dimmed(),
              "Ensure your OpenAI API key is valid".yellow(),
              "Check your account credits".yellow(),
              "Verify the configured base URL and service availability".yellow()
            ),
          OpenAIError::Reqwest(e) =>
            format!(
              "{} {}\n    {}\n\nDetails:\n    {}\n\nSuggested Actions:\n    1. {}\n    2. {}",
              "ERROR:".bold().bright_red(),
              "Network error:".bright_white(),
              e.to_string().dimmed(),
              "Failed to connect to the completion service.".dimmed(),
              "Check your internet connection".yellow(),
              "Verify the service is not experiencing downtime".yellow()
            ),
          _ =>
            format!(
              "{} {}\n    {}\n\nDetails:\n    {}",
              "ERROR:".bold().bright_red(),
              "Unexpected error:".bright_white(),
              err.to_string().dimmed(),
              "An unexpected error occurred while communicating with the completion service.".dimmed()
            ),
        };
        return Err(anyhow!(error_msg));
      }
    };

    if let Some(usage) = &response.usage {
      PROMPT_TOKENS.fetch_add(usage.prompt_tokens as usize, Ordering::Relaxed);
      COMPLETION_TOKENS.fetch_add(usage.completion_tokens as usize, Ordering::Relaxed);
    }

    let content = response
      .choices
      .first()
      .context("No choices returned")?
      .message
      .content
      .clone()
      .context("No content returned")?;

    Ok(Response { response: content })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_to_fit_keeps_small_input() {
    let text = "one\ntwo\nthree";
    let result = truncate_to_fit(text, 1000, &Model::GPT4oMini).unwrap();
    assert_eq!(result, text);
  }

  #[test]
  fn test_truncate_to_fit_marks_elision() {
    let text = "line\n".repeat(2000);
    let result = truncate_to_fit(&text, 100, &Model::Llama2).unwrap();
    assert!(result.contains("truncated for length"));
    assert!(result.len() < text.len());
  }
}
