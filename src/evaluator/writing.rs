//! Writing quiz: translate a Japanese sentence into English.
//!
//! A failed backend call still yields the length heuristic here, not a hard
//! zero as in the word quiz.

use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

use super::{coerce_score, first_present, primary_text, text_of, Evaluator, FallbackPolicy, FALLBACK_NOTE, NO_ANSWER_FEEDBACK};
use crate::domain::WritingEvaluation;
use crate::extract::ModelReply;
use crate::util::{fill_template, word_count};

pub const WRITING_LONG_SCORE: u8 = 80;
pub const WRITING_SHORT_SCORE: u8 = 30;
/// Answers with more words than this get the long score.
pub const WRITING_MIN_WORDS: usize = 3;
pub const WRITING_STATIC_EXAMPLE: &str = "This is an example.";

const EXAMPLE_KEYS: &[&str] = &["en", "english", "sentence", "text", "example"];

#[derive(Debug, Deserialize)]
struct WritingReply {
  #[serde(default)]
  score: Value,
  #[serde(default)]
  feedback: Value,
  #[serde(default)]
  correct_example: Value,
  #[serde(default)]
  example: Value,
}

impl Evaluator {
  #[instrument(level = "info", skip_all, fields(prompt_len = prompt_text.len(), answer_len = learner_answer.len(), assisted = self.is_assisted()))]
  pub async fn evaluate_writing(&self, prompt_text: &str, learner_answer: &str) -> WritingEvaluation {
    if learner_answer.trim().is_empty() {
      return WritingEvaluation { score: 0, feedback: NO_ANSWER_FEEDBACK.into(), correct_example: String::new() };
    }

    let Some(backend) = self.backend.as_deref() else {
      return writing_unassisted(learner_answer);
    };

    let prompt = fill_template(
      &self.prompts.writing_eval_template,
      &[("prompt", prompt_text), ("answer", learner_answer)],
    );

    match self.ask(backend, "writing", &prompt).await {
      Ok(raw) => match ModelReply::<WritingReply>::from_text(&raw) {
        ModelReply::Parsed(reply) => WritingEvaluation {
          score: coerce_score(&reply.score),
          feedback: text_of(&reply.feedback),
          correct_example: primary_text(first_present(&[&reply.correct_example, &reply.example]), EXAMPLE_KEYS),
        },
        ModelReply::ParseFailure => {
          warn!(target: "evaluator", "Writing reply had no usable JSON; using fallback.");
          self.writing_fallback(learner_answer)
        }
      },
      Err(_) => self.writing_fallback(learner_answer),
    }
  }

  fn writing_fallback(&self, learner_answer: &str) -> WritingEvaluation {
    match self.fallback {
      FallbackPolicy::Legacy => WritingEvaluation {
        score: length_score(learner_answer),
        feedback: format!("{}改善点を確認してください。", FALLBACK_NOTE),
        correct_example: WRITING_STATIC_EXAMPLE.into(),
      },
      FallbackPolicy::Heuristic => {
        let mut local = writing_unassisted(learner_answer);
        local.feedback = format!("{}{}", FALLBACK_NOTE, local.feedback);
        local
      }
    }
  }
}

fn length_score(answer: &str) -> u8 {
  if word_count(answer) > WRITING_MIN_WORDS { WRITING_LONG_SCORE } else { WRITING_SHORT_SCORE }
}

/// Local scoring by length, with banded feedback.
pub fn writing_unassisted(learner_answer: &str) -> WritingEvaluation {
  let score = length_score(learner_answer);
  let feedback = if score == WRITING_LONG_SCORE {
    "（簡易採点）よく書けています。細かい表現を見直してみましょう。"
  } else {
    "（簡易採点）もう少し長い英文で書いてみましょう。"
  };
  WritingEvaluation { score, feedback: feedback.into(), correct_example: WRITING_STATIC_EXAMPLE.into() }
}
