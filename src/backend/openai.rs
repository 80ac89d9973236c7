//! Minimal OpenAI-compatible client.
//!
//! We only call chat.completions with one system and one user message and
//! return the plain text of the first choice. JSON mode is not requested:
//! the evaluators extract the object themselves, which also works for
//! compatible servers that ignore `response_format`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::{extract_api_error, http_client, BackendError, TextBackend};

#[derive(Clone)]
pub struct OpenAi {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  system_prompt: String,
  timeout: Duration,
}

impl OpenAi {
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
impl TextBackend for OpenAi {
  fn name(&self) -> &str {
    "openai"
  }

  fn model(&self) -> &str {
    &self.model
  }

  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: &self.model,
      messages: vec![
        ChatMessageReq { role: "system", content: &self.system_prompt },
        ChatMessageReq { role: "user", content: prompt },
      ],
      temperature: 0.2,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or(body);
      error!(%status, elapsed = ?start.elapsed(), "OpenAI call failed");
      return Err(BackendError::Api { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, elapsed = ?start.elapsed(), "OpenAI usage");
    }

    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default();

    if text.trim().is_empty() {
      return Err(BackendError::EmptyResponse);
    }
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'a str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}
