//! Minimal Gemini client: `models/{model}:generateContent` with a system
//! instruction and one user turn, returning the concatenated text parts.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::{extract_api_error, http_client, BackendError, TextBackend};

#[derive(Clone)]
pub struct Gemini {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  system_prompt: String,
  timeout: Duration,
}

impl Gemini {
  pub fn new(
    api_key: &str,
    base_url: &str,
    model: &str,
    system_prompt: &str,
    timeout: Duration,
  ) -> Result<Self, BackendError> {
    Ok(Self {
      client: http_client(timeout)?,
      api_key: api_key.to_string(),
      base_url: base_url.trim_end_matches('/').to_string(),
      model: model.to_string(),
      system_prompt: system_prompt.to_string(),
      timeout,
    })
  }
}

#[async_trait]
impl TextBackend for Gemini {
  fn name(&self) -> &str {
    "gemini"
  }

  fn model(&self) -> &str {
    &self.model
  }

  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
    let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateContentRequest {
      system_instruction: (!self.system_prompt.is_empty()).then(|| Content {
        role: None,
        parts: vec![PartReq { text: &self.system_prompt }],
      }),
      contents: vec![Content { role: Some("user"), parts: vec![PartReq { text: prompt }] }],
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req).send().await
      .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or(body);
      error!(%status, elapsed = ?start.elapsed(), "Gemini call failed");
      return Err(BackendError::Api { status: status.as_u16(), message });
    }

    let body: GenerateContentResponse = res.json().await
      .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, elapsed = ?start.elapsed(), "Gemini usage");
    }

    let text: String = body.candidates.into_iter().next()
      .and_then(|c| c.content)
      .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
      .unwrap_or_default();

    if text.trim().is_empty() {
      return Err(BackendError::EmptyResponse);
    }
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content<'a>>,
  contents: Vec<Content<'a>>,
}
#[derive(Serialize)]
struct Content<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<&'a str>,
  parts: Vec<PartReq<'a>>,
}
#[derive(Serialize)]
struct PartReq<'a> { text: &'a str }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<CandidateContent> }
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}
