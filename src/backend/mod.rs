//! Generative text backends.
//!
//! Evaluators only need "prompt in, free text out". `TextBackend` is that
//! seam; `gemini` and `openai` are the HTTP clients behind it, and `mock`
//! scripts replies for tests.
//!
//! We never log API keys or prompt contents, only models, sizes and latency.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{BackendKind, BackendSettings};

pub mod gemini;
#[cfg(test)]
pub mod mock;
pub mod openai;

pub use gemini::Gemini;
pub use openai::OpenAi;

const USER_AGENT_VALUE: &str = "studyst-backend/0.1";

/// Errors from a single backend call. All of them are recovered inside the
/// evaluators; none reaches an HTTP client.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
  #[error("request timed out after {0}s")]
  Timeout(u64),

  #[error("network error: {0}")]
  Network(String),

  #[error("API error (HTTP {status}): {message}")]
  Api { status: u16, message: String },

  #[error("response could not be decoded: {0}")]
  Decode(String),

  #[error("response contained no text")]
  EmptyResponse,
}

impl BackendError {
  pub(crate) fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
    if e.is_timeout() {
      BackendError::Timeout(timeout.as_secs())
    } else if e.is_decode() {
      BackendError::Decode(e.to_string())
    } else {
      BackendError::Network(e.to_string())
    }
  }
}

/// A text-generation service: one prompt in, free-form text out.
#[async_trait]
pub trait TextBackend: Send + Sync {
  /// Provider name for logs (e.g. "gemini").
  fn name(&self) -> &str;

  /// Model identifier used for calls.
  fn model(&self) -> &str;

  async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Build the configured backend, if any. A client that cannot be built is
/// logged and treated as "not configured".
pub fn from_settings(
  settings: Option<&BackendSettings>,
  timeout: Duration,
  system_prompt: &str,
) -> Option<Arc<dyn TextBackend>> {
  let Some(s) = settings else {
    info!(target: "studyst_backend", "No generative backend configured. Using local scoring.");
    return None;
  };

  let built: Result<Arc<dyn TextBackend>, BackendError> = match s.kind {
    BackendKind::Gemini => Gemini::new(&s.api_key, &s.base_url, &s.model, system_prompt, timeout)
      .map(|b| Arc::new(b) as Arc<dyn TextBackend>),
    BackendKind::OpenAi => OpenAi::new(&s.api_key, &s.base_url, &s.model, system_prompt, timeout)
      .map(|b| Arc::new(b) as Arc<dyn TextBackend>),
  };

  match built {
    Ok(b) => {
      info!(target: "studyst_backend", provider = b.name(), model = b.model(), base_url = %s.base_url, timeout_secs = timeout.as_secs(), "Generative backend enabled.");
      Some(b)
    }
    Err(e) => {
      error!(target: "studyst_backend", error = %e, "Failed to build backend client; using local scoring.");
      None
    }
  }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
  reqwest::Client::builder()
    .timeout(timeout)
    .user_agent(USER_AGENT_VALUE)
    .build()
    .map_err(|e| BackendError::Network(e.to_string()))
}

/// Try to extract a clean error message from an `{"error": {"message": ...}}`
/// body. Gemini and OpenAI both use this envelope.
pub(crate) fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
