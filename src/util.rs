//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Literal JSON braces in a template are left alone unless they spell a key.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Whitespace-separated word count, as used by the writing heuristics.
pub fn word_count(s: &str) -> usize {
  s.split_whitespace().count()
}

/// Log-safe truncation for large strings (counts chars, so it never splits
/// a multi-byte character).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  let total = s.chars().count();
  if total <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} chars total)", head, total)
  }
}
