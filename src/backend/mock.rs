//! Scripted backend for testing the evaluators without HTTP.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendError, TextBackend};

/// Replays queued results in order; once the queue is empty, every call
/// returns the last configured result again.
pub struct MockBackend {
  queue: Mutex<VecDeque<Result<String, BackendError>>>,
  last: Mutex<Result<String, BackendError>>,
  call_count: AtomicU32,
  last_prompt: Mutex<Option<String>>,
}

impl MockBackend {
  pub fn new(results: Vec<Result<String, BackendError>>) -> Self {
    let last = results.last().cloned().unwrap_or(Err(BackendError::EmptyResponse));
    Self {
      queue: Mutex::new(results.into()),
      last: Mutex::new(last),
      call_count: AtomicU32::new(0),
      last_prompt: Mutex::new(None),
    }
  }

  /// Always reply with `text`.
  pub fn replying(text: &str) -> Self {
    Self::new(vec![Ok(text.to_string())])
  }

  /// Always fail with `err`.
  pub fn failing(err: BackendError) -> Self {
    Self::new(vec![Err(err)])
  }

  pub fn call_count(&self) -> u32 {
    self.call_count.load(Ordering::Relaxed)
  }

  pub fn last_prompt(&self) -> Option<String> {
    self.last_prompt.lock().unwrap().clone()
  }
}

#[async_trait]
impl TextBackend for MockBackend {
  fn name(&self) -> &str {
    "mock"
  }

  fn model(&self) -> &str {
    "mock-model"
  }

  async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
    self.call_count.fetch_add(1, Ordering::Relaxed);
    *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
    let next = self.queue.lock().unwrap().pop_front();
    match next {
      Some(r) => r,
      None => self.last.lock().unwrap().clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn replays_queue_then_repeats_last() {
    let mock = MockBackend::new(vec![Ok("a".into()), Err(BackendError::Timeout(20))]);
    assert_eq!(mock.generate("p1").await, Ok("a".into()));
    assert_eq!(mock.generate("p2").await, Err(BackendError::Timeout(20)));
    assert_eq!(mock.generate("p3").await, Err(BackendError::Timeout(20)));
    assert_eq!(mock.call_count(), 3);
    assert_eq!(mock.last_prompt().as_deref(), Some("p3"));
  }
}
