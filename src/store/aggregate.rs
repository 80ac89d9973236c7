//! Averages and the leaderboard. Always computed from the logs, never cached.

use rusqlite::params;

use super::{Store, StoreError};
use crate::domain::{AttemptKind, LeaderboardEntry, GUEST_ID};

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}

impl Store {
  /// Mean word-quiz score of a learner, rounded to two decimals.
  /// 0 without attempts, and always 0 for the guest id.
  pub fn average_score(&self, learner_id: i64) -> Result<f64, StoreError> {
    self.average_score_for(AttemptKind::Word, learner_id)
  }

  pub fn average_score_for(&self, kind: AttemptKind, learner_id: i64) -> Result<f64, StoreError> {
    if learner_id == GUEST_ID {
      return Ok(0.0);
    }
    let conn = self.connect()?;
    let sql = format!("SELECT AVG(score) FROM {} WHERE user_id = ?1", kind.table());
    let avg: Option<f64> = conn.query_row(&sql, [learner_id], |r| r.get(0))?;
    Ok(avg.map(round2).unwrap_or(0.0))
  }

  /// Registered learners ranked by average word score, best first. Attempts
  /// whose learner no longer exists are ignored.
  pub fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StoreError> {
    let conn = self.connect()?;
    let mut stmt = conn.prepare(
      "SELECT u.username, AVG(s.score) AS avg_score
       FROM student_answers s
       JOIN users u ON s.user_id = u.id
       GROUP BY u.id
       ORDER BY avg_score DESC, u.id ASC
       LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |r| {
      Ok(LeaderboardEntry {
        display_name: r.get::<_, Option<String>>(0)?.unwrap_or_default(),
        average_score: round2(r.get::<_, Option<f64>>(1)?.unwrap_or(0.0)),
      })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
  }
}
