//! Built-in quiz content, inserted on first start so the app is usable
//! without an imported database.

/// (word, Japanese meaning, part of speech)
pub fn seed_words() -> &'static [(&'static str, &'static str, &'static str)] {
  &[
    ("apple", "りんご", "noun"),
    ("banana", "バナナ", "noun"),
    ("orange", "オレンジ", "noun, adjective"),
    ("grape", "ぶどう", "noun"),
    ("peach", "もも", "noun"),
    ("assurance", "保証", "noun"),
    ("rapid", "急速な", "adjective"),
    ("borrow", "借りる", "verb"),
    ("seldom", "めったに～ない", "adverb"),
    ("although", "～だけれども", "conjunction"),
  ]
}

pub struct SeedPrompt {
  pub prompt_text: &'static str,
  pub reference_example: &'static str,
}

pub fn seed_prompts() -> Vec<SeedPrompt> {
  vec![
    SeedPrompt { prompt_text: "私は昨日、映画を見ました。", reference_example: "I watched a movie yesterday." },
    SeedPrompt { prompt_text: "明日は雨が降るでしょう。", reference_example: "It will probably rain tomorrow." },
    SeedPrompt { prompt_text: "昨日の夜ご飯は何を食べましたか？", reference_example: "What did you have for dinner last night?" },
    SeedPrompt { prompt_text: "私は英語を勉強しています。", reference_example: "I am studying English." },
    SeedPrompt { prompt_text: "週末に友達と遊びます。", reference_example: "I will hang out with my friends on the weekend." },
  ]
}

pub struct SeedPassage {
  pub title: &'static str,
  pub passage_text: &'static str,
  pub question_text: &'static str,
  pub reference_answer: &'static str,
  pub level: &'static str,
}

pub fn seed_passages() -> Vec<SeedPassage> {
  vec![
    SeedPassage {
      title: "A Sunday in the Park",
      passage_text: "Tom went to the park on Sunday. He played soccer with his friends. After the game, they ate sandwiches under a big tree.",
      question_text: "What did Tom play in the park?",
      reference_answer: "soccer",
      level: "beginner",
    },
    SeedPassage {
      title: "The New Library",
      passage_text: "A new library opened near the station last month. It has a quiet study room and a cafe. Many students go there after school to do their homework.",
      question_text: "Where is the new library?",
      reference_answer: "near the station",
      level: "beginner",
    },
    SeedPassage {
      title: "Saving Water",
      passage_text: "Clean water is limited. Simple habits, like turning off the tap while brushing your teeth, can save many liters every day. Small actions by many people make a big difference.",
      question_text: "What simple habit does the passage mention?",
      reference_answer: "turning off the tap while brushing your teeth",
      level: "intermediate",
    },
  ]
}
