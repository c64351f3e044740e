use anyhow::Result;
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;

use crate::model::Model;
use crate::reviewer::{Reviewer, SUMMARY_PROMPT, SYSTEM_PROMPT};

/// Reviewer backed by a locally running Ollama server.
pub struct OllamaReviewer {
  model: Model
}

impl OllamaReviewer {
  pub fn new(model: Model) -> Self {
    Self { model }
  }

  async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
    let ollama = Ollama::default();

    // Ollama has no separate system channel, so roles are inlined
    let full_prompt = format!("### System:\n{system}\n\n### User:\n{prompt}\n\n### Assistant:");

    let request = GenerationRequest::new(self.model.to_string(), full_prompt).options(GenerationOptions::default());
    let response = ollama.generate(request).await?;

    Ok(response.response.trim().to_string())
  }
}

#[async_trait]
impl Reviewer for OllamaReviewer {
  fn name(&self) -> String {
    format!("Ollama ({})", self.model)
  }

  async fn review_file(&self, context: &str) -> Result<String> {
    self
      .generate(SYSTEM_PROMPT, &format!("Review the following code changes:\n\n{context}"))
      .await
  }

  async fn summarize(&self, comments: &str) -> Result<String> {
    self
      .generate(SYSTEM_PROMPT, &format!("{SUMMARY_PROMPT}\n\nFindings:\n{comments}"))
      .await
  }
}
