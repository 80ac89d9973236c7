//! Part-of-speech canonicalization.
//!
//! Raw part-of-speech strings come from the word table and from model output
//! ("noun, verb", "Noun/Verb", "adj (countable)", ...). They are reduced to a
//! fixed set of Japanese display labels, de-duplicated in first-seen order.

/// Catch-all label for empty input or input with no known tokens.
pub const UNCLASSIFIED: &str = "その他";

/// Separator between labels. Both characters are also split points, so a
/// joined result normalizes to itself.
pub const LABEL_SEPARATOR: &str = " / ";

const POS_TABLE: &[(&str, &str)] = &[
  ("noun", "名詞"),
  ("n", "名詞"),
  ("verb", "動詞"),
  ("v", "動詞"),
  ("adjective", "形容詞"),
  ("adj", "形容詞"),
  ("adverb", "副詞"),
  ("adv", "副詞"),
  ("pronoun", "代名詞"),
  ("preposition", "前置詞"),
  ("conjunction", "接続詞"),
  ("interjection", "間投詞"),
  ("article", "冠詞"),
  ("determiner", "限定詞"),
  ("numeral", "数詞"),
  ("particle", "不変化詞"),
  ("modal", "助動詞"),
  ("other", "その他"),
];

fn is_separator(c: char) -> bool {
  matches!(c, ',' | '/' | '\\' | '，' | '、') || c.is_whitespace()
}

fn lookup(run: &str) -> Option<&'static str> {
  let lower = run.to_lowercase();

  if let Some((_, label)) = POS_TABLE.iter().find(|(key, _)| *key == lower) {
    return Some(*label);
  }
  if let Some((_, label)) = POS_TABLE.iter().find(|(_, label)| *label == run) {
    return Some(*label);
  }
  // "nouns", "nounish": longest full key that prefixes the run. Single-letter
  // keys never match this way ("nothing" is not a noun marker).
  POS_TABLE
    .iter()
    .filter(|(key, _)| key.len() >= 3 && lower.starts_with(key))
    .max_by_key(|(key, _)| key.len())
    .map(|(_, label)| *label)
}

/// Map a raw part-of-speech string to the canonical label string.
/// Total and deterministic; unknown tokens are dropped.
pub fn normalize_pos(raw: Option<&str>) -> String {
  let mut labels: Vec<&'static str> = Vec::new();

  for token in raw.unwrap_or_default().split(is_separator) {
    let run: String = token.chars().take_while(|c| c.is_alphabetic()).collect();
    if run.is_empty() {
      continue;
    }
    if let Some(label) = lookup(&run) {
      if !labels.contains(&label) {
        labels.push(label);
      }
    }
  }

  if labels.is_empty() {
    UNCLASSIFIED.to_string()
  } else {
    labels.join(LABEL_SEPARATOR)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_and_missing_are_unclassified() {
    assert_eq!(normalize_pos(None), UNCLASSIFIED);
    assert_eq!(normalize_pos(Some("")), UNCLASSIFIED);
    assert_eq!(normalize_pos(Some("  , / ")), UNCLASSIFIED);
  }

  #[test]
  fn mixed_case_tokens_keep_order() {
    assert_eq!(normalize_pos(Some("Noun, VERB")), "名詞 / 動詞");
    assert_eq!(normalize_pos(Some("Verb/Noun")), "動詞 / 名詞");
  }

  #[test]
  fn duplicates_collapse() {
    assert_eq!(normalize_pos(Some("noun noun")), "名詞");
    assert_eq!(normalize_pos(Some("n, noun，nouns")), "名詞");
  }

  #[test]
  fn leading_alphabetic_run_is_used() {
    assert_eq!(normalize_pos(Some("adj.")), "形容詞");
    assert_eq!(normalize_pos(Some("adj (countable)")), "形容詞");
    assert_eq!(normalize_pos(Some("nounish")), "名詞");
    assert_eq!(normalize_pos(Some("adv\\prep")), "副詞");
  }

  #[test]
  fn unknown_tokens_are_dropped_not_mapped_to_other() {
    assert_eq!(normalize_pos(Some("gerund, verb")), "動詞");
    assert_eq!(normalize_pos(Some("gerund xyz")), UNCLASSIFIED);
    assert_eq!(normalize_pos(Some("nothing")), UNCLASSIFIED);
  }

  #[test]
  fn canonical_labels_are_fixed_points() {
    for raw in ["noun", "Noun, VERB", "adverb/other", "modal", "", "interjection article numeral"] {
      let once = normalize_pos(Some(raw));
      assert_eq!(normalize_pos(Some(&once)), once, "not idempotent for {raw:?}");
    }
    for (_, label) in POS_TABLE {
      assert_eq!(normalize_pos(Some(*label)), *label);
    }
  }
}
