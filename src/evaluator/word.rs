//! Word quiz: does the learner's Japanese answer capture the word's meaning?

use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

use super::{coerce_score, first_present, pick, primary_text, text_of, Evaluator, FallbackPolicy, FALLBACK_NOTE};
use crate::domain::{UsageExample, WordEvaluation, PASS_THRESHOLD};
use crate::extract::ModelReply;
use crate::pos::normalize_pos;
use crate::util::fill_template;

pub const WORD_MATCH_SCORE: u8 = 100;
pub const WORD_MISS_SCORE: u8 = 60;
pub const WORD_FAILED_FEEDBACK: &str = "採点できませんでした。";

const EXAMPLE_SOURCE_KEYS: &[&str] = &["en", "english", "sentence", "text", "example"];
const EXAMPLE_TARGET_KEYS: &[&str] = &["ja", "japanese", "translation", "example_translation"];

#[derive(Debug, Default, Deserialize)]
struct WordReply {
  #[serde(default)]
  score: Value,
  #[serde(default)]
  feedback: Value,
  #[serde(default)]
  example: Value,
  #[serde(default)]
  example_translation: Value,
  #[serde(default)]
  part_of_speech: Value,
  #[serde(default)]
  pos: Value,
  #[serde(default)]
  simplified_meaning: Value,
  #[serde(default)]
  simple_meaning: Value,
}

impl Evaluator {
  #[instrument(level = "info", skip_all, fields(%word, answer_len = learner_answer.len(), assisted = self.is_assisted()))]
  pub async fn evaluate_word_answer(
    &self,
    word: &str,
    reference_meaning: &str,
    learner_answer: &str,
    pos_hint: Option<&str>,
  ) -> WordEvaluation {
    let Some(backend) = self.backend.as_deref() else {
      return word_unassisted(word, reference_meaning, learner_answer, pos_hint);
    };

    let prompt = fill_template(
      &self.prompts.word_eval_template,
      &[("word", word), ("reference_meaning", reference_meaning), ("answer", learner_answer)],
    );

    match self.ask(backend, "word", &prompt).await {
      Ok(raw) => match ModelReply::<WordReply>::from_text(&raw) {
        ModelReply::Parsed(reply) => word_from_reply(reply, reference_meaning, pos_hint),
        ModelReply::ParseFailure => {
          warn!(target: "evaluator", %word, "Word reply had no usable JSON; using fallback.");
          self.word_fallback(word, reference_meaning, learner_answer, pos_hint)
        }
      },
      Err(_) => self.word_fallback(word, reference_meaning, learner_answer, pos_hint),
    }
  }

  fn word_fallback(&self, word: &str, reference_meaning: &str, learner_answer: &str, pos_hint: Option<&str>) -> WordEvaluation {
    match self.fallback {
      FallbackPolicy::Legacy => WordEvaluation {
        score: 0,
        feedback: WORD_FAILED_FEEDBACK.into(),
        example: UsageExample::default(),
        pos_label: normalize_pos(pos_hint),
        simplified_meaning: reference_meaning.to_string(),
      },
      FallbackPolicy::Heuristic => {
        let mut local = word_unassisted(word, reference_meaning, learner_answer, pos_hint);
        local.feedback = format!("{}{}", FALLBACK_NOTE, local.feedback);
        local
      }
    }
  }
}

/// Local scoring: the reference meaning must appear verbatim in the answer.
pub fn word_unassisted(word: &str, reference_meaning: &str, learner_answer: &str, pos_hint: Option<&str>) -> WordEvaluation {
  let matched = !learner_answer.trim().is_empty() && learner_answer.contains(reference_meaning);
  let score = if matched { WORD_MATCH_SCORE } else { WORD_MISS_SCORE };
  let feedback = if score >= PASS_THRESHOLD {
    "（簡易採点）Good!"
  } else {
    "（簡易採点）もう少し詳しく書いてみよう"
  };

  WordEvaluation {
    score,
    feedback: feedback.into(),
    example: UsageExample { source: format!("Example: {word} is used like ..."), target: String::new() },
    pos_label: normalize_pos(pos_hint),
    simplified_meaning: reference_meaning.to_string(),
  }
}

fn word_from_reply(reply: WordReply, reference_meaning: &str, pos_hint: Option<&str>) -> WordEvaluation {
  let raw_pos = text_of(first_present(&[&reply.part_of_speech, &reply.pos]));
  let pos_source = if raw_pos.is_empty() { pos_hint } else { Some(raw_pos.as_str()) };

  let source = primary_text(&reply.example, EXAMPLE_SOURCE_KEYS);
  let target = Some(text_of(&reply.example_translation))
    .filter(|s| !s.is_empty())
    .or_else(|| pick(&reply.example, EXAMPLE_TARGET_KEYS))
    .unwrap_or_default();

  let simplified = text_of(first_present(&[&reply.simplified_meaning, &reply.simple_meaning]));

  WordEvaluation {
    score: coerce_score(&reply.score),
    feedback: text_of(&reply.feedback),
    example: UsageExample { source, target },
    pos_label: normalize_pos(pos_source),
    simplified_meaning: if simplified.is_empty() { reference_meaning.to_string() } else { simplified },
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

  fn assisted(mock: Arc<MockBackend>, fallback: FallbackPolicy) -> Evaluator {
    let backend: Arc<dyn TextBackend> = mock;
    Evaluator::new(Some(backend), Prompts::default(), fallback)
  }

  #[tokio::test]
  async fn unassisted_scores_by_containment() {
    let ev = Evaluator::unassisted();
    let hit = ev.evaluate_word_answer("dog", "犬", "犬を表す単語", None).await;
    assert_eq!(hit.score, WORD_MATCH_SCORE);
    assert_eq!(hit.feedback, "（簡易採点）Good!");

    let miss = ev.evaluate_word_answer("dog", "犬", "xyz", None).await;
    assert_eq!(miss.score, WORD_MISS_SCORE);
    assert_eq!(miss.feedback, "（簡易採点）もう少し詳しく書いてみよう");

    let blank = ev.evaluate_word_answer("dog", "犬", "   ", None).await;
    assert_eq!(blank.score, WORD_MISS_SCORE);
  }

  #[tokio::test]
  async fn unassisted_end_to_end_uses_stored_hint() {
    let ev = Evaluator::unassisted();
    let out = ev.evaluate_word_answer("assurance", "保証", "保証すること", Some("noun")).await;
    assert!(out.score >= PASS_THRESHOLD);
    assert_eq!(out.pos_label, "名詞");
    assert_eq!(out.simplified_meaning, "保証");
    assert_eq!(out.example.source, "Example: assurance is used like ...");
  }

  #[tokio::test]
  async fn assisted_parses_full_reply() {
    let mock = Arc::new(MockBackend::replying(
      r#"採点結果です:
{"score": 92, "feedback": "よくできました", "example": {"en": "You have my assurance.", "ja": "私が保証します。"},
 "part_of_speech": ["Noun", "noun"], "simplified_meaning": "だいじょうぶだと約束すること"}
以上"#,
    ));
    let ev = assisted(mock.clone(), FallbackPolicy::Legacy);
    let out = ev.evaluate_word_answer("assurance", "保証", "保証", Some("verb")).await;

    assert_eq!(out, WordEvaluation {
      score: 92,
      feedback: "よくできました".into(),
      example: UsageExample { source: "You have my assurance.".into(), target: "私が保証します。".into() },
      pos_label: "名詞".into(),
      simplified_meaning: "だいじょうぶだと約束すること".into(),
    });
    let prompt = mock.last_prompt().unwrap();
    assert!(prompt.contains("単語: assurance"));
    assert!(prompt.contains("正しい意味: 保証"));
  }

  #[tokio::test]
  async fn reply_with_both_field_spellings_is_scored() {
    let ev = assisted(
      Arc::new(MockBackend::replying(
        r#"{"score": 90, "feedback": "good", "pos": "noun", "part_of_speech": "noun",
            "simple_meaning": "", "simplified_meaning": "約束"}"#,
      )),
      FallbackPolicy::Legacy,
    );
    let out = ev.evaluate_word_answer("assurance", "保証", "保証", None).await;
    assert_eq!(out.score, 90);
    assert_eq!(out.feedback, "good");
    assert_eq!(out.pos_label, "名詞");
    assert_eq!(out.simplified_meaning, "約束");

    let ev = assisted(Arc::new(MockBackend::replying(r#"{"score": 75, "pos": "verb"}"#)), FallbackPolicy::Legacy);
    let out = ev.evaluate_word_answer("borrow", "借りる", "借りる", None).await;
    assert_eq!(out.pos_label, "動詞");
  }

  #[tokio::test]
  async fn assisted_scores_are_bounded() {
    for (raw, expected) in [
      (r#"{"score": 150}"#, 100),
      (r#"{"score": -5}"#, 0),
      (r#"{"score": "abc"}"#, 0),
      (r#"{"feedback": "no score"}"#, 0),
    ] {
      let ev = assisted(Arc::new(MockBackend::replying(raw)), FallbackPolicy::Legacy);
      let out = ev.evaluate_word_answer("dog", "犬", "犬", None).await;
      assert_eq!(out.score, expected, "reply {raw}");
    }
  }

  #[tokio::test]
  async fn missing_pos_and_meaning_fall_back_to_hint_and_reference() {
    let ev = assisted(
      Arc::new(MockBackend::replying(r#"{"score": 70, "feedback": "ok", "example": "A rapid change.", "example_translation": "急速な変化。"}"#)),
      FallbackPolicy::Legacy,
    );
    let out = ev.evaluate_word_answer("rapid", "急速な", "速い", Some("adj.")).await;
    assert_eq!(out.pos_label, "形容詞");
    assert_eq!(out.simplified_meaning, "急速な");
    assert_eq!(out.example, UsageExample { source: "A rapid change.".into(), target: "急速な変化。".into() });
  }

  #[tokio::test]
  async fn backend_failure_is_hard_zero_under_legacy_policy() {
    let ev = assisted(Arc::new(MockBackend::failing(BackendError::Timeout(20))), FallbackPolicy::Legacy);
    let out = ev.evaluate_word_answer("assurance", "保証", "保証", Some("noun")).await;
    assert_eq!(out, WordEvaluation {
      score: 0,
      feedback: WORD_FAILED_FEEDBACK.into(),
      example: UsageExample::default(),
      pos_label: "名詞".into(),
      simplified_meaning: "保証".into(),
    });
  }

  #[tokio::test]
  async fn malformed_reply_uses_same_fallback_as_call_failure() {
    let ev = assisted(Arc::new(MockBackend::replying("Sorry, I cannot grade this.")), FallbackPolicy::Legacy);
    let out = ev.evaluate_word_answer("dog", "犬", "犬", None).await;
    assert_eq!(out.score, 0);
    assert_eq!(out.feedback, WORD_FAILED_FEEDBACK);
  }

  #[tokio::test]
  async fn heuristic_policy_uses_local_score_on_failure() {
    let ev = assisted(Arc::new(MockBackend::failing(BackendError::Network("down".into()))), FallbackPolicy::Heuristic);
    let out = ev.evaluate_word_answer("dog", "犬", "犬です", None).await;
    assert_eq!(out.score, WORD_MATCH_SCORE);
    assert!(out.feedback.starts_with(FALLBACK_NOTE));
  }
}
