//! Answer evaluation for the three quiz kinds.
//!
//! An `Evaluator` is built once at startup with an optional backend. With a
//! backend it runs in *assisted* mode (prompt the model, extract JSON, clamp);
//! without one it runs the deterministic *unassisted* heuristics. Every public
//! method is total: backend errors and malformed replies end in a fallback
//! result, never in an `Err`.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::backend::{BackendError, TextBackend};
use crate::config::Prompts;

mod reading;
mod word;
mod writing;

/// Feedback for blank answers (writing and reading).
pub const NO_ANSWER_FEEDBACK: &str = "回答が入力されていません。";

/// Prefix added to local feedback when the heuristic stands in for a failed backend call.
pub const FALLBACK_NOTE: &str = "（AI採点に失敗したため簡易採点）";

/// What to return when the backend call or its parse fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
  /// Per-quiz policies: words score 0, writing uses the length heuristic,
  /// reading returns a fixed mid-range score.
  #[default]
  Legacy,
  /// Every quiz falls back to its unassisted heuristic.
  Heuristic,
}

impl FromStr for FallbackPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "legacy" => Ok(FallbackPolicy::Legacy),
      "heuristic" => Ok(FallbackPolicy::Heuristic),
      other => Err(format!("unknown fallback policy: {other}")),
    }
  }
}

#[derive(Clone)]
pub struct Evaluator {
  backend: Option<Arc<dyn TextBackend>>,
  prompts: Prompts,
  fallback: FallbackPolicy,
}

impl Evaluator {
  pub fn new(backend: Option<Arc<dyn TextBackend>>, prompts: Prompts, fallback: FallbackPolicy) -> Self {
    Self { backend, prompts, fallback }
  }

  /// Evaluator without a backend, default prompts and policy.
  pub fn unassisted() -> Self {
    Self::new(None, Prompts::default(), FallbackPolicy::default())
  }

  pub fn is_assisted(&self) -> bool {
    self.backend.is_some()
  }

  pub fn backend_name(&self) -> Option<&str> {
    self.backend.as_deref().map(|b| b.name())
  }

  /// One timed backend call.
  async fn ask(&self, backend: &dyn TextBackend, quiz: &'static str, prompt: &str) -> Result<String, BackendError> {
    let start = Instant::now();
    let result = backend.generate(prompt).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(text) => info!(target: "evaluator", %quiz, provider = backend.name(), ?elapsed, reply_len = text.len(), "Model reply received"),
      Err(e) => error!(target: "evaluator", %quiz, provider = backend.name(), ?elapsed, error = %e, "Model call failed"),
    }
    result
  }
}

/// Score from model output: integers as-is, floats truncated, integer strings
/// parsed; anything else (or missing) is 0. Always clamped to 0..=100.
pub(crate) fn coerce_score(v: &Value) -> u8 {
  let raw = match v {
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)).unwrap_or(0),
    Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
    _ => 0,
  };
  raw.clamp(0, 100) as u8
}

/// Plain text of a scalar reply field. Null, objects and arrays of non-strings give "".
pub(crate) fn text_of(v: &Value) -> String {
  match v {
    Value::String(s) => s.trim().to_string(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Array(items) => items
      .iter()
      .map(text_of)
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(", "),
    Value::Null | Value::Object(_) => String::new(),
  }
}

/// First non-blank string under one of `keys`, when `v` is an object.
pub(crate) fn pick(v: &Value, keys: &[&str]) -> Option<String> {
  let obj = v.as_object()?;
  keys
    .iter()
    .filter_map(|k| obj.get(*k))
    .map(text_of)
    .find(|s| !s.is_empty())
}

/// First candidate that carries content. Models sometimes send a field under
/// both of its accepted names; a null or blank string loses to the other one.
pub(crate) fn first_present<'a>(candidates: &[&'a Value]) -> &'a Value {
  static NULL: Value = Value::Null;
  candidates
    .iter()
    .copied()
    .find(|v| match v {
      Value::Null => false,
      Value::String(s) => !s.trim().is_empty(),
      Value::Array(items) => !items.is_empty(),
      Value::Object(obj) => !obj.is_empty(),
      _ => true,
    })
    .unwrap_or(&NULL)
}

/// Primary-language text of a possibly structured field: a string as-is,
/// an object's component under `keys` (else its first string value), an
/// array's first element.
pub(crate) fn primary_text(v: &Value, keys: &[&str]) -> String {
  match v {
    Value::Object(obj) => pick(v, keys)
      .or_else(|| obj.values().map(text_of).find(|s| !s.is_empty()))
      .unwrap_or_default(),
    Value::Array(items) => items.first().map(|first| primary_text(first, keys)).unwrap_or_default(),
    other => text_of(other),
  }
}
