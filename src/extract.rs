//! Pulling one JSON object out of free-form model output.
//!
//! Models are told to answer with JSON only, but they routinely wrap the
//! object in prose or code fences, or append commentary after it.
//!
//! - `extract_json` cuts the first *balanced* `{...}` (string-aware) and parses it.
//! - `extract_json_greedy` cuts from the first `{` to the last `}`. The reading
//!   evaluator uses this lighter parse; it fails when the output holds two objects.
//! - `ModelReply<T>` turns either cut into a typed reply or `ParseFailure`.
//!
//! Nothing here returns an error: every failure becomes an empty map.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::util::trunc_for_log;

pub type JsonMap = Map<String, Value>;

/// Parse the first balanced `{...}` in `raw`. Empty map on any failure.
pub fn extract_json(raw: &str) -> JsonMap {
  match balanced_object(raw) {
    Some(slice) => parse_object(slice),
    None => {
      debug!(target: "evaluator", raw = %trunc_for_log(raw, 80), "No balanced JSON object in model output");
      JsonMap::new()
    }
  }
}

/// Parse the greedy `(?s)\{.*\}` match in `raw`. Empty map on any failure.
pub fn extract_json_greedy(raw: &str) -> JsonMap {
  static GREEDY: OnceLock<Option<Regex>> = OnceLock::new();
  let Some(re) = GREEDY.get_or_init(|| Regex::new(r"(?s)\{.*\}").ok()) else {
    return JsonMap::new();
  };
  match re.find(raw) {
    Some(m) => parse_object(m.as_str()),
    None => JsonMap::new(),
  }
}

fn balanced_object(raw: &str) -> Option<&str> {
  let start = raw.find('{')?;
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (offset, ch) in raw[start..].char_indices() {
    if in_string {
      if escaped {
        escaped = false;
      } else if ch == '\\' {
        escaped = true;
      } else if ch == '"' {
        in_string = false;
      }
      continue;
    }
    match ch {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&raw[start..start + offset + 1]);
        }
      }
      _ => {}
    }
  }
  None
}

fn parse_object(slice: &str) -> JsonMap {
  match serde_json::from_str::<Value>(slice) {
    Ok(Value::Object(map)) => map,
    Ok(_) => JsonMap::new(),
    Err(e) => {
      debug!(target: "evaluator", error = %e, slice = %trunc_for_log(slice, 80), "Model JSON did not parse");
      JsonMap::new()
    }
  }
}

/// A model reply after extraction: either the expected shape or a parse failure.
/// Evaluators map `ParseFailure` to their documented fallback result.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply<T> {
  Parsed(T),
  ParseFailure,
}

impl<T: DeserializeOwned> ModelReply<T> {
  pub fn from_text(raw: &str) -> Self {
    Self::from_map(extract_json(raw))
  }

  pub fn from_text_greedy(raw: &str) -> Self {
    Self::from_map(extract_json_greedy(raw))
  }

  fn from_map(map: JsonMap) -> Self {
    if map.is_empty() {
      return ModelReply::ParseFailure;
    }
    match serde_json::from_value::<T>(Value::Object(map)) {
      Ok(v) => ModelReply::Parsed(v),
      Err(e) => {
        debug!(target: "evaluator", error = %e, "Model JSON has an unexpected shape");
        ModelReply::ParseFailure
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use serde::Deserialize;
  use serde_json::json;

  fn as_value(map: JsonMap) -> Value {
    Value::Object(map)
  }

  #[test]
  fn extracts_object_surrounded_by_prose() {
    let out = extract_json(r#"blah blah {"score": 80, "feedback": "ok"} trailing"#);
    assert_eq!(as_value(out), json!({"score": 80, "feedback": "ok"}));
  }

  #[test]
  fn no_json_gives_empty_map() {
    assert!(extract_json("no json here").is_empty());
    assert!(extract_json("").is_empty());
  }

  #[test]
  fn broken_json_gives_empty_map() {
    assert!(extract_json("{broken").is_empty());
    assert!(extract_json(r#"{"score": 80,}"#).is_empty());
  }

  #[test]
  fn handles_code_fences_and_nested_objects() {
    let raw = "```json\n{\"score\": 90, \"example\": {\"en\": \"I need an assurance.\", \"ja\": \"保証が必要です。\"}}\n```\nHope this helps!";
    let out = extract_json(raw);
    assert_eq!(out["score"], json!(90));
    assert_eq!(out["example"]["ja"], json!("保証が必要です。"));
  }

  #[test]
  fn braces_inside_strings_do_not_close_the_object() {
    let raw = r#"Result: {"feedback": "use } and { carefully \" ok", "score": 70} (done) {"score": 1}"#;
    let out = extract_json(raw);
    assert_eq!(out["score"], json!(70));
    assert_eq!(out["feedback"], json!("use } and { carefully \" ok"));
  }

  #[test]
  fn balanced_takes_first_of_two_objects_but_greedy_fails() {
    let raw = r#"{"score": 10} and later {"score": 99}"#;
    assert_eq!(extract_json(raw)["score"], json!(10));
    assert!(extract_json_greedy(raw).is_empty());
  }

  #[test]
  fn greedy_spans_multiline_output() {
    let raw = "Here you go:\n{\n  \"score\": 65,\n  \"feedback\": \"惜しい\"\n}\n";
    let out = extract_json_greedy(raw);
    assert_eq!(as_value(out), json!({"score": 65, "feedback": "惜しい"}));
  }

  #[derive(Debug, Deserialize, PartialEq)]
  struct ScoreOnly {
    score: i64,
  }

  #[test]
  fn model_reply_tags_parse_failures() {
    assert_eq!(ModelReply::<ScoreOnly>::from_text(r#"x {"score": 3} y"#), ModelReply::Parsed(ScoreOnly { score: 3 }));
    assert_eq!(ModelReply::<ScoreOnly>::from_text("nothing"), ModelReply::ParseFailure);
    assert_eq!(ModelReply::<ScoreOnly>::from_text("{}"), ModelReply::ParseFailure);
    assert_eq!(ModelReply::<ScoreOnly>::from_text(r#"{"score": "high"}"#), ModelReply::ParseFailure);
  }
}
