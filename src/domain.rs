//! Domain models: quiz items, learners, evaluation results and attempt bookkeeping.

use serde::{Deserialize, Serialize};

/// Learner id used for guest sessions. Never stored in the learner table.
pub const GUEST_ID: i64 = 0;

/// Display name shown for guest sessions.
pub const GUEST_NAME: &str = "ゲスト";

/// Scores below this count as a failed attempt for the failure streak.
pub const PASS_THRESHOLD: u8 = 70;

/// A vocabulary entry. `part_of_speech` is the raw, unnormalized source string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LexicalItem {
  pub id: i64,
  pub surface_form: String,
  pub reference_meaning: String,
  #[serde(default)]
  pub part_of_speech: Option<String>,
}

/// A sentence the learner translates into English.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WritingPrompt {
  pub id: i64,
  pub prompt_text: String,
  #[serde(default)]
  pub reference_example: Option<String>,
  #[serde(default)]
  pub reference_meaning: Option<String>,
}

/// A short passage with one comprehension question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingPassage {
  pub id: i64,
  pub title: String,
  pub passage_text: String,
  pub question_text: String,
  pub reference_answer: String,
  #[serde(default)]
  pub level: Option<String>,
  #[serde(default)]
  pub source_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Learner {
  pub id: i64,
  pub display_name: String,
  pub is_guest: bool,
}

impl Learner {
  pub fn guest() -> Self {
    Self { id: GUEST_ID, display_name: GUEST_NAME.into(), is_guest: true }
  }
}

/// Which append-only attempt log a submission belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptKind {
  Word,
  Writing,
  Reading,
}

impl AttemptKind {
  pub fn table(self) -> &'static str {
    match self {
      AttemptKind::Word => "student_answers",
      AttemptKind::Writing => "writing_answers",
      AttemptKind::Reading => "reading_answers",
    }
  }

  pub fn item_column(self) -> &'static str {
    match self {
      AttemptKind::Word => "word_id",
      AttemptKind::Writing => "prompt_id",
      AttemptKind::Reading => "passage_id",
    }
  }
}

/// English usage sentence plus its Japanese rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UsageExample {
  pub source: String,
  pub target: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordEvaluation {
  pub score: u8,
  pub feedback: String,
  pub example: UsageExample,
  pub pos_label: String,
  pub simplified_meaning: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingEvaluation {
  pub score: u8,
  pub feedback: String,
  pub correct_example: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadingEvaluation {
  pub score: u8,
  pub feedback: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingTranslation {
  pub reference_translation: String,
  pub score: u8,
  pub feedback: String,
}

/// Bookkeeping computed when an attempt is appended to its log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
  pub attempt_id: i64,
  pub is_below_threshold: bool,
  pub consecutive_failure_count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
  pub display_name: String,
  pub average_score: f64,
}
