//! Public HTTP request/response structs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//! Quiz items go out without their reference answers.

use serde::{Deserialize, Serialize};

use crate::domain::{
  AttemptOutcome, LeaderboardEntry, Learner, LexicalItem, ReadingEvaluation, ReadingPassage, ReadingTranslation,
  WordEvaluation, WritingEvaluation, WritingPrompt,
};

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

//
// Auth
//

#[derive(Deserialize)]
pub struct CredentialsIn {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
  pub learner: Learner,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeOut {
  pub learner: Learner,
  pub average_score: f64,
}

//
// Quiz items
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordOut {
  pub id: i64,
  pub word: String,
  pub part_of_speech: Option<String>,
}

impl From<LexicalItem> for WordOut {
  fn from(w: LexicalItem) -> Self {
    Self { id: w.id, word: w.surface_form, part_of_speech: w.part_of_speech }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOut {
  pub id: i64,
  pub text: String,
}

impl From<WritingPrompt> for PromptOut {
  fn from(p: WritingPrompt) -> Self {
    Self { id: p.id, text: p.prompt_text }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageOut {
  pub id: i64,
  pub title: String,
  pub passage: String,
  pub question: String,
  pub level: Option<String>,
}

impl From<ReadingPassage> for PassageOut {
  fn from(p: ReadingPassage) -> Self {
    Self { id: p.id, title: p.title, passage: p.passage_text, question: p.question_text, level: p.level }
  }
}

//
// Answers
//

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnswerIn {
  pub word_id: i64,
  #[serde(default)]
  pub answer: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingAnswerIn {
  pub prompt_id: i64,
  #[serde(default)]
  pub answer: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingAnswerIn {
  pub passage_id: i64,
  #[serde(default)]
  pub answer: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnswerOut {
  #[serde(flatten)]
  pub evaluation: WordEvaluation,
  pub attempt: AttemptOutcome,
  pub average_score: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingAnswerOut {
  #[serde(flatten)]
  pub evaluation: WritingEvaluation,
  pub attempt: AttemptOutcome,
  pub average_score: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingAnswerOut {
  #[serde(flatten)]
  pub evaluation: ReadingEvaluation,
  pub attempt: AttemptOutcome,
  pub average_score: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingTranslateOut {
  #[serde(flatten)]
  pub translation: ReadingTranslation,
  pub attempt: AttemptOutcome,
  pub average_score: f64,
}

#[derive(Serialize)]
pub struct RankingOut {
  pub ranking: Vec<LeaderboardEntry>,
}
