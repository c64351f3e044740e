//! Shared JSON HTTP client for the hosting provider APIs.
//!
//! Read-only: the tool never mutates the host, so only GET is exposed.
//! Transient failures (429, 5xx, transport errors) are retried with
//! exponential backoff and jitter, bounded by `max_retries` from config.

use std::time::Duration;

use anyhow::{anyhow, Context};
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::config;
use crate::provider::Result;

const BACKOFF_BASE_MS: u64 = 500;

pub struct Http {
  client:      Client,
  max_retries: usize
}

impl Http {
  pub fn new() -> Result<Self> {
    let timeout = config::APP.timeout.unwrap_or(30) as u64;

    let client = Client::builder()
      .user_agent(concat!("review-ai/", env!("CARGO_PKG_VERSION")))
      .connect_timeout(Duration::from_secs(timeout))
      .timeout(Duration::from_secs(timeout))
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self {
      client,
      max_retries: config::APP.max_retries.unwrap_or(3)
    })
  }

  pub async fn get<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap, query: &[(&str, &str)]) -> Result<T> {
    let mut attempt = 0;

    loop {
      log::debug!("HTTP GET {url} (attempt {})", attempt + 1);

      let response = self
        .client
        .get(url)
        .headers(headers.clone())
        .query(query)
        .send()
        .await;

      match response {
        Ok(response) if response.status().is_success() => {
          return Ok(response.json::<T>().await?);
        }
        Ok(response) if retryable(response.status()) && attempt < self.max_retries => {
          log::warn!("HTTP {} from {url}, retrying", response.status());
        }
        Ok(response) => {
          let status = response.status();
          let body = response.text().await.unwrap_or_default();
          return Err(anyhow!("HTTP {status} from {url}: {body}").into());
        }
        Err(err) if attempt < self.max_retries => {
          log::warn!("Request to {url} failed ({err}), retrying");
        }
        Err(err) => return Err(err.into())
      }

      attempt += 1;
      tokio::time::sleep(backoff(attempt)).await;
    }
  }
}

fn retryable(status: StatusCode) -> bool {
  status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: usize) -> Duration {
  let base = BACKOFF_BASE_MS * (1 << attempt.min(6));
  let jitter = rand::rng().random_range(0..BACKOFF_BASE_MS);
  Duration::from_millis(base + jitter)
}
