use anyhow::Result;
use rusqlite::{Connection, params};

use crate::models::StreakRow;
use crate::{Database, OptionalExt};

impl Database {
    pub fn get_streak(&self, user_id: &str) -> Result<Option<StreakRow>> {
        self.with_conn(|conn| get_streak(conn, user_id))
    }
}

pub fn get_streak(conn: &Connection, user_id: &str) -> Result<Option<StreakRow>> {
    conn.query_row(
        "SELECT user_id, current_streak, longest_streak, total_votes, last_vote_date
         FROM challenge_streaks WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(StreakRow {
                user_id: row.get(0)?,
                current_streak: row.get(1)?,
                longest_streak: row.get(2)?,
                total_votes: row.get(3)?,
                last_vote_date: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Creates the user's streak row or overwrites it in place.
pub fn upsert_streak(conn: &Connection, streak: &StreakRow, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO challenge_streaks
             (user_id, current_streak, longest_streak, total_votes, last_vote_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         ON CONFLICT (user_id) DO UPDATE SET
             current_streak = excluded.current_streak,
             longest_streak = excluded.longest_streak,
             total_votes    = excluded.total_votes,
             last_vote_date = excluded.last_vote_date,
             updated_at     = excluded.updated_at",
        params![
            streak.user_id,
            streak.current_streak,
            streak.longest_streak,
            streak.total_votes,
            streak.last_vote_date,
            now,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(current: i64, longest: i64, total: i64, last: &str) -> StreakRow {
        StreakRow {
            user_id: "u1".into(),
            current_streak: current,
            longest_streak: longest,
            total_votes: total,
            last_vote_date: last.into(),
        }
    }

    #[test]
    fn upsert_creates_then_updates_single_row() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            upsert_streak(conn, &row(1, 1, 1, "2026-03-01"), "2026-03-01 10:00:00")?;
            upsert_streak(conn, &row(2, 2, 2, "2026-03-02"), "2026-03-02 10:00:00")
        })
        .unwrap();

        assert_eq!(db.get_streak("u1").unwrap(), Some(row(2, 2, 2, "2026-03-02")));
        assert_eq!(db.get_streak("u2").unwrap(), None);
    }

    #[test]
    fn longest_below_current_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| upsert_streak(conn, &row(3, 2, 3, "2026-03-01"), "2026-03-01 10:00:00"));
        assert!(result.is_err());
    }
}
