//! Reading quiz: answer a question about a short English passage, or
//! translate it. Model replies on this path go through the greedy extractor.

use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

use super::{coerce_score, first_present, text_of, Evaluator, FallbackPolicy, FALLBACK_NOTE, NO_ANSWER_FEEDBACK};
use crate::domain::{ReadingEvaluation, ReadingTranslation};
use crate::extract::ModelReply;
use crate::util::fill_template;

pub const READING_MATCH_SCORE: u8 = 80;
pub const READING_MISS_SCORE: u8 = 40;
pub const READING_DEFAULT_SCORE: u8 = 50;
pub const READING_LOCAL_FEEDBACK: &str = "（簡易採点）内容を確認してください。";
pub const READING_FAILED_FEEDBACK: &str = "採点に失敗したため、デフォルトスコアを返しました。";
pub const TRANSLATE_LOCAL_FEEDBACK: &str = "（簡易採点）模範訳を用意できませんでした。本文と見比べて自分で確認してみましょう。";

#[derive(Debug, Deserialize)]
struct ReadingReply {
  #[serde(default)]
  score: Value,
  #[serde(default)]
  feedback: Value,
}

#[derive(Debug, Deserialize)]
struct TranslationReply {
  #[serde(default)]
  reference_translation: Value,
  #[serde(default)]
  translation: Value,
  #[serde(default)]
  score: Value,
  #[serde(default)]
  feedback: Value,
}

impl Evaluator {
  #[instrument(level = "info", skip_all, fields(answer_len = learner_answer.len(), assisted = self.is_assisted()))]
  pub async fn evaluate_reading(
    &self,
    passage: &str,
    question: &str,
    reference_answer: &str,
    learner_answer: &str,
  ) -> ReadingEvaluation {
    if learner_answer.trim().is_empty() {
      return ReadingEvaluation { score: 0, feedback: NO_ANSWER_FEEDBACK.into() };
    }

    let Some(backend) = self.backend.as_deref() else {
      return reading_unassisted(reference_answer, learner_answer);
    };

    let prompt = fill_template(
      &self.prompts.reading_eval_template,
      &[
        ("passage", passage),
        ("question", question),
        ("reference_answer", reference_answer),
        ("answer", learner_answer),
      ],
    );

    let reply = match self.ask(backend, "reading", &prompt).await {
      Ok(raw) => ModelReply::<ReadingReply>::from_text_greedy(&raw),
      Err(_) => return self.reading_fallback(reference_answer, learner_answer),
    };

    match reply {
      ModelReply::Parsed(r) => ReadingEvaluation { score: coerce_score(&r.score), feedback: text_of(&r.feedback) },
      ModelReply::ParseFailure => {
        warn!(target: "evaluator", "Reading reply had no usable JSON; using fallback.");
        self.reading_fallback(reference_answer, learner_answer)
      }
    }
  }

  /// Grade a Japanese rendering of the passage and return a model translation.
  #[instrument(level = "info", skip_all, fields(answer_len = learner_answer.len(), assisted = self.is_assisted()))]
  pub async fn evaluate_and_translate_reading(
    &self,
    passage: &str,
    learner_answer: &str,
    question: &str,
  ) -> ReadingTranslation {
    if learner_answer.trim().is_empty() {
      return ReadingTranslation { reference_translation: String::new(), score: 0, feedback: NO_ANSWER_FEEDBACK.into() };
    }

    let Some(backend) = self.backend.as_deref() else {
      return translate_unassisted();
    };

    let prompt = fill_template(
      &self.prompts.reading_translate_template,
      &[("passage", passage), ("question", question), ("answer", learner_answer)],
    );

    let reply = match self.ask(backend, "reading_translate", &prompt).await {
      Ok(raw) => ModelReply::<TranslationReply>::from_text_greedy(&raw),
      Err(_) => return self.translate_fallback(),
    };

    match reply {
      ModelReply::Parsed(r) => ReadingTranslation {
        reference_translation: text_of(first_present(&[&r.reference_translation, &r.translation])),
        score: coerce_score(&r.score),
        feedback: text_of(&r.feedback),
      },
      ModelReply::ParseFailure => {
        warn!(target: "evaluator", "Translation reply had no usable JSON; using fallback.");
        self.translate_fallback()
      }
    }
  }

  fn reading_fallback(&self, reference_answer: &str, learner_answer: &str) -> ReadingEvaluation {
    match self.fallback {
      FallbackPolicy::Legacy => ReadingEvaluation { score: READING_DEFAULT_SCORE, feedback: READING_FAILED_FEEDBACK.into() },
      FallbackPolicy::Heuristic => {
        let mut local = reading_unassisted(reference_answer, learner_answer);
        local.feedback = format!("{}{}", FALLBACK_NOTE, local.feedback);
        local
      }
    }
  }

  fn translate_fallback(&self) -> ReadingTranslation {
    match self.fallback {
      FallbackPolicy::Legacy => ReadingTranslation {
        reference_translation: String::new(),
        score: READING_DEFAULT_SCORE,
        feedback: READING_FAILED_FEEDBACK.into(),
      },
      FallbackPolicy::Heuristic => {
        let mut local = translate_unassisted();
        local.feedback = format!("{}{}", FALLBACK_NOTE, local.feedback);
        local
      }
    }
  }
}

/// Case-insensitive containment of the reference answer. A blank reference
/// never matches.
pub fn reading_unassisted(reference_answer: &str, learner_answer: &str) -> ReadingEvaluation {
  let reference = reference_answer.trim().to_lowercase();
  let answer = learner_answer.trim().to_lowercase();
  let matched = !reference.is_empty() && answer.contains(&reference);
  let score = if matched { READING_MATCH_SCORE } else { READING_MISS_SCORE };
  ReadingEvaluation { score, feedback: READING_LOCAL_FEEDBACK.into() }
}

fn translate_unassisted() -> ReadingTranslation {
  ReadingTranslation {
    reference_translation: String::new(),
    score: READING_DEFAULT_SCORE,
    feedback: TRANSLATE_LOCAL_FEEDBACK.into(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::mock::MockBackend;
  use crate::backend::{BackendError, TextBackend};
  use crate::config::Prompts;
  use pretty_assertions::assert_eq;
  use std::sync::Arc;

  const PASSAGE: &str = "Tom went to the park on Sunday. He played soccer with his friends.";
  const QUESTION: &str = "What did Tom play?";

  fn assisted(mock: Arc<MockBackend>, fallback: FallbackPolicy) -> Evaluator {
    let backend: Arc<dyn TextBackend> = mock;
    Evaluator::new(Some(backend), Prompts::default(), fallback)
  }

  #[tokio::test]
  async fn unassisted_matches_reference_ignoring_case() {
    let ev = Evaluator::unassisted();
    let hit = ev.evaluate_reading(PASSAGE, QUESTION, " Soccer ", "He played SOCCER.").await;
    assert_eq!(hit, ReadingEvaluation { score: READING_MATCH_SCORE, feedback: READING_LOCAL_FEEDBACK.into() });

    let miss = ev.evaluate_reading(PASSAGE, QUESTION, "soccer", "baseball").await;
    assert_eq!(miss.score, READING_MISS_SCORE);
  }

  #[tokio::test]
  async fn blank_reference_is_never_a_match() {
    let ev = Evaluator::unassisted();
    let out = ev.evaluate_reading(PASSAGE, QUESTION, "  ", "He played soccer.").await;
    assert_eq!(out.score, READING_MISS_SCORE);
  }

  #[tokio::test]
  async fn blank_answers_score_zero_without_calling_backend() {
    let mock = Arc::new(MockBackend::replying(r#"{"score": 90, "feedback": "good"}"#));
    let ev = assisted(mock.clone(), FallbackPolicy::Legacy);
    let out = ev.evaluate_reading(PASSAGE, QUESTION, "soccer", " ").await;
    assert_eq!(out, ReadingEvaluation { score: 0, feedback: NO_ANSWER_FEEDBACK.into() });
    let out = ev.evaluate_and_translate_reading(PASSAGE, "", QUESTION).await;
    assert_eq!(out.score, 0);
    assert_eq!(mock.call_count(), 0);
  }

  #[tokio::test]
  async fn assisted_reading_uses_greedy_parse() {
    let mock = Arc::new(MockBackend::replying("結果:\n{\n \"score\": 85,\n \"feedback\": \"正解です\"\n}\n"));
    let ev = assisted(mock.clone(), FallbackPolicy::Legacy);
    let out = ev.evaluate_reading(PASSAGE, QUESTION, "soccer", "He played soccer.").await;
    assert_eq!(out, ReadingEvaluation { score: 85, feedback: "正解です".into() });
    assert!(mock.last_prompt().unwrap().contains("模範解答: soccer"));

    // Two objects make the greedy cut invalid JSON.
    let ev = assisted(
      Arc::new(MockBackend::replying(r#"{"score": 85} {"feedback": "x"}"#)),
      FallbackPolicy::Legacy,
    );
    let out = ev.evaluate_reading(PASSAGE, QUESTION, "soccer", "soccer").await;
    assert_eq!(out, ReadingEvaluation { score: READING_DEFAULT_SCORE, feedback: READING_FAILED_FEEDBACK.into() });
  }

  #[tokio::test]
  async fn failures_return_default_score_or_heuristic() {
    let legacy = assisted(Arc::new(MockBackend::failing(BackendError::EmptyResponse)), FallbackPolicy::Legacy);
    let out = legacy.evaluate_reading(PASSAGE, QUESTION, "soccer", "soccer").await;
    assert_eq!(out.score, READING_DEFAULT_SCORE);

    let heuristic = assisted(Arc::new(MockBackend::failing(BackendError::EmptyResponse)), FallbackPolicy::Heuristic);
    let out = heuristic.evaluate_reading(PASSAGE, QUESTION, "soccer", "soccer").await;
    assert_eq!(out.score, READING_MATCH_SCORE);
    assert!(out.feedback.starts_with(FALLBACK_NOTE));
  }

  #[tokio::test]
  async fn translate_variant_reads_translation_alias() {
    let mock = Arc::new(MockBackend::replying(
      r#"{"translation": "トムは日曜日に公園へ行った。", "score": "75", "feedback": "自然な訳です"}"#,
    ));
    let ev = assisted(mock, FallbackPolicy::Legacy);
    let out = ev.evaluate_and_translate_reading(PASSAGE, "トムは日曜日公園に行った。", QUESTION).await;
    assert_eq!(out, ReadingTranslation {
      reference_translation: "トムは日曜日に公園へ行った。".into(),
      score: 75,
      feedback: "自然な訳です".into(),
    });
  }

  #[tokio::test]
  async fn translate_reply_with_both_keys_prefers_reference_translation() {
    let mock = Arc::new(MockBackend::replying(
      r#"{"reference_translation": "トムは日曜日に公園へ行った。", "translation": "", "score": 88, "feedback": "良い"}"#,
    ));
    let out = assisted(mock, FallbackPolicy::Legacy)
      .evaluate_and_translate_reading(PASSAGE, "トムは日曜日公園に行った。", QUESTION)
      .await;
    assert_eq!(out.score, 88);
    assert_eq!(out.reference_translation, "トムは日曜日に公園へ行った。");
  }

  #[tokio::test]
  async fn translate_failures_follow_policy() {
    let answer = "トムは日曜日公園に行った。";
    for mock in [MockBackend::failing(BackendError::Timeout(20)), MockBackend::replying("not json")] {
      let out = assisted(Arc::new(mock), FallbackPolicy::Legacy)
        .evaluate_and_translate_reading(PASSAGE, answer, QUESTION)
        .await;
      assert_eq!(out, ReadingTranslation {
        reference_translation: String::new(),
        score: READING_DEFAULT_SCORE,
        feedback: READING_FAILED_FEEDBACK.into(),
      });
    }

    for mock in [MockBackend::failing(BackendError::Network("down".into())), MockBackend::replying("not json")] {
      let out = assisted(Arc::new(mock), FallbackPolicy::Heuristic)
        .evaluate_and_translate_reading(PASSAGE, answer, QUESTION)
        .await;
      assert_eq!(out, ReadingTranslation {
        reference_translation: String::new(),
        score: READING_DEFAULT_SCORE,
        feedback: format!("{}{}", FALLBACK_NOTE, TRANSLATE_LOCAL_FEEDBACK),
      });
    }
  }

  #[tokio::test]
  async fn translate_without_backend_asks_for_self_check() {
    let out = Evaluator::unassisted().evaluate_and_translate_reading(PASSAGE, "トムは公園へ行った。", QUESTION).await;
    assert_eq!(out.reference_translation, "");
    assert_eq!(out.score, READING_DEFAULT_SCORE);
    assert_eq!(out.feedback, TRANSLATE_LOCAL_FEEDBACK);
  }
}
