//! Process configuration: environment variables plus an optional TOML file
//! overriding the scoring prompts.
//!
//! Everything is read once at startup and fixed afterwards. Nothing here can
//! fail startup: bad values are logged and replaced by defaults, and a
//! missing backend key simply means local (unassisted) scoring.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::evaluator::FallbackPolicy;
use crate::store::StreakPolicy;

const DEV_SESSION_SECRET: &str = "dev_secret_for_local_only";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
  Gemini,
  OpenAi,
}

/// Connection details for the generative backend.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendSettings {
  pub kind: BackendKind,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl fmt::Debug for BackendSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BackendSettings")
      .field("kind", &self.kind)
      .field("api_key", &"<redacted>")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .finish()
  }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  pub database_path: PathBuf,
  /// Pre-built database copied into `database_path` when that file is missing.
  pub database_seed_path: Option<PathBuf>,
  pub session_secret: String,
  pub backend: Option<BackendSettings>,
  pub backend_timeout: Duration,
  pub fallback: FallbackPolicy,
  pub streak: StreakPolicy,
  pub bcrypt_cost: u32,
  pub prompts: Prompts,
}

impl AppConfig {
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build the config from any key lookup. Blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let port = parse_or(get("PORT"), "PORT", 8080u16);
    let database_path = get("DATABASE_PATH")
      .map(PathBuf::from)
      .unwrap_or_else(|| std::env::temp_dir().join("english_learning.db"));
    let database_seed_path = get("DATABASE_SEED_PATH").map(PathBuf::from);

    let session_secret = get("SESSION_SECRET").unwrap_or_else(|| {
      warn!(target: "studyst_backend", "SESSION_SECRET not set; using the development secret.");
      DEV_SESSION_SECRET.to_string()
    });

    let backend = if let Some(api_key) = get("GEMINI_API_KEY") {
      Some(BackendSettings {
        kind: BackendKind::Gemini,
        api_key,
        base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| "https://generativelanguage.googleapis.com".into()),
        model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
      })
    } else if let Some(api_key) = get("OPENAI_API_KEY") {
      Some(BackendSettings {
        kind: BackendKind::OpenAi,
        api_key,
        base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into()),
        model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
      })
    } else {
      warn!(target: "studyst_backend", "Neither GEMINI_API_KEY nor OPENAI_API_KEY set; running without a generative backend.");
      None
    };

    let backend_timeout = Duration::from_secs(parse_or(get("BACKEND_TIMEOUT_SECS"), "BACKEND_TIMEOUT_SECS", 20u64));
    let fallback = parse_or(get("SCORING_FALLBACK"), "SCORING_FALLBACK", FallbackPolicy::default());
    let streak = parse_or(get("STREAK_POLICY"), "STREAK_POLICY", StreakPolicy::default());
    let bcrypt_cost = parse_or(get("BCRYPT_COST"), "BCRYPT_COST", bcrypt::DEFAULT_COST);

    let prompts = get("PROMPTS_CONFIG_PATH")
      .and_then(|path| load_prompts_file(&path))
      .unwrap_or_default();

    Self {
      port,
      database_path,
      database_seed_path,
      session_secret,
      backend,
      backend_timeout,
      fallback,
      streak,
      bcrypt_cost,
      prompts,
    }
  }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> T {
  match raw {
    None => default,
    Some(v) => v.parse().unwrap_or_else(|_| {
      warn!(target: "studyst_backend", %key, value = %v, "Unparseable setting; using default.");
      default
    }),
  }
}

/// Prompt templates sent to the generative backend. `{key}` placeholders are
/// filled by `util::fill_template`; any field may be overridden from TOML.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Prompts {
  /// System instruction shared by every call.
  pub system: String,
  /// Placeholders: {word}, {reference_meaning}, {answer}.
  pub word_eval_template: String,
  /// Placeholders: {prompt}, {answer}.
  pub writing_eval_template: String,
  /// Placeholders: {passage}, {question}, {reference_answer}, {answer}.
  pub reading_eval_template: String,
  /// Placeholders: {passage}, {question}, {answer}.
  pub reading_translate_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "あなたは日本人学習者を指導する英語の先生です。指示された形式のJSONオブジェクトだけを出力してください。".into(),
      word_eval_template: r#"学習者の回答を採点し、日本語でアドバイスと例文を作ってください。
必ずJSON形式のみで出力してください。余計な文字は付けないでください。

単語: {word}
正しい意味: {reference_meaning}
学習者の回答: {answer}

出力形式:
{"score": 0から100の整数, "feedback": "学習者へのアドバイス", "example": "その単語を使った英語の例文", "example_translation": "例文の日本語訳", "part_of_speech": "noun, verb など英語の品詞（複数可）", "simplified_meaning": "やさしい日本語での意味"}"#.into(),
      writing_eval_template: r#"次の日本語を英語に翻訳する課題です。学習者の英文を採点してください。
必ずJSON形式のみで出力してください。

お題: {prompt}
学習者の回答: {answer}

出力形式:
{"score": 0から100の整数, "feedback": "日本語での改善アドバイス", "correct_example": "自然な英語の模範解答"}"#.into(),
      reading_eval_template: r#"英文読解の問題です。学習者の回答を採点してください。
必ずJSON形式のみで出力してください。

本文: {passage}
質問: {question}
模範解答: {reference_answer}
学習者の回答: {answer}

出力形式:
{"score": 0から100の整数, "feedback": "日本語でのアドバイス"}"#.into(),
      reading_translate_template: r#"英文の和訳問題です。本文の自然な日本語訳を作り、それと比べて学習者の訳を採点してください。
必ずJSON形式のみで出力してください。

本文: {passage}
設問: {question}
学習者の訳: {answer}

出力形式:
{"reference_translation": "本文の日本語訳", "score": 0から100の整数, "feedback": "日本語でのアドバイス"}"#.into(),
    }
  }
}

/// Shape of the TOML file behind `PROMPTS_CONFIG_PATH`.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsFile {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Load prompt overrides from TOML. On any parsing/IO error, returns None.
pub fn load_prompts_file(path: &str) -> Option<Prompts> {
  match std::fs::read_to_string(path) {
    Ok(s) => match toml::from_str::<PromptsFile>(&s) {
      Ok(cfg) => {
        info!(target: "studyst_backend", %path, "Loaded prompt overrides (TOML)");
        Some(cfg.prompts)
      }
      Err(e) => {
        error!(target: "studyst_backend", %path, error = %e, "Failed to parse TOML prompts");
        None
      }
    },
    Err(e) => {
      error!(target: "studyst_backend", %path, error = %e, "Failed to read TOML prompts file");
      None
    }
  }
}
