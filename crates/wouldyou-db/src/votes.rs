use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, Row, params};

use crate::models::{VoteInsert, VoteRow};
use crate::{Database, OptionalExt};

impl Database {
    pub fn get_vote(&self, voter_key: &str, challenge_id: &str) -> Result<Option<VoteRow>> {
        self.with_conn(|conn| get_vote(conn, voter_key, challenge_id))
    }

    pub fn choices_for(&self, voter_key: &str, challenge_ids: &[String]) -> Result<HashMap<String, String>> {
        self.with_conn(|conn| choices_for(conn, voter_key, challenge_ids))
    }

    /// Per-choice counts of ledger rows for one challenge. Maintenance and
    /// audit helper: tallies are served from the challenge row.
    pub fn ledger_counts(&self, challenge_id: &str) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT COALESCE(SUM(choice = 'A'), 0), COALESCE(SUM(choice = 'B'), 0)
                 FROM votes WHERE challenge_id = ?1",
                [challenge_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(counts)
        })
    }
}

/// Inserts a vote. Returns `false` if this voter already has a vote on the
/// challenge; the `UNIQUE(voter_key, challenge_id)` constraint decides.
pub fn insert_vote(conn: &Connection, vote: &VoteInsert<'_>) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO votes (id, voter_key, user_id, guest_id, challenge_id, choice, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (voter_key, challenge_id) DO NOTHING",
        params![
            vote.id,
            vote.voter_key,
            vote.user_id,
            vote.guest_id,
            vote.challenge_id,
            vote.choice,
            vote.created_at,
        ],
    )?;
    Ok(changed == 1)
}

pub fn get_vote(conn: &Connection, voter_key: &str, challenge_id: &str) -> Result<Option<VoteRow>> {
    conn.query_row(
        "SELECT id, user_id, guest_id, challenge_id, choice, created_at
         FROM votes WHERE voter_key = ?1 AND challenge_id = ?2",
        [voter_key, challenge_id],
        map_vote,
    )
    .optional()
}

/// Batch-fetch one voter's choices for a set of challenges, keyed by challenge id.
pub fn choices_for(conn: &Connection, voter_key: &str, challenge_ids: &[String]) -> Result<HashMap<String, String>> {
    if challenge_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (2..=challenge_ids.len() + 1).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT challenge_id, choice FROM votes WHERE voter_key = ?1 AND challenge_id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(challenge_ids.len() + 1);
    params.push(&voter_key);
    params.extend(challenge_ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));

    let choices = stmt
        .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<HashMap<String, String>, _>>()?;

    Ok(choices)
}

/// Votes cast by a guest token with `start <= created_at < end`.
pub fn count_guest_votes_between(conn: &Connection, guest_id: &str, start: &str, end: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM votes WHERE guest_id = ?1 AND created_at >= ?2 AND created_at < ?3",
        [guest_id, start, end],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn map_vote(row: &Row<'_>) -> rusqlite::Result<VoteRow> {
    Ok(VoteRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        guest_id: row.get(2)?,
        challenge_id: row.get(3)?,
        choice: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenges::insert_challenge;
    use crate::models::ChallengeInsert;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            for id in ["c1", "c2"] {
                insert_challenge(
                    conn,
                    &ChallengeInsert {
                        id,
                        option_a: "Always be cold",
                        option_b: "Always be hot",
                        category: "comfort",
                        daily_date: None,
                        created_at: "2026-03-01 08:00:00",
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();
        db
    }

    fn guest_vote<'a>(id: &'a str, challenge_id: &'a str, created_at: &'a str) -> VoteInsert<'a> {
        VoteInsert {
            id,
            voter_key: "guest:g1",
            user_id: None,
            guest_id: Some("g1"),
            challenge_id,
            choice: "A",
            created_at,
        }
    }

    #[test]
    fn duplicate_vote_is_ignored_by_constraint() {
        let db = setup();
        db.with_conn(|conn| {
            assert!(insert_vote(conn, &guest_vote("v1", "c1", "2026-03-01 09:00:00"))?);
            assert!(!insert_vote(conn, &guest_vote("v2", "c1", "2026-03-01 09:00:01"))?);
            Ok(())
        })
        .unwrap();

        let vote = db.get_vote("guest:g1", "c1").unwrap().unwrap();
        assert_eq!(vote.id, "v1");
        assert_eq!(db.ledger_counts("c1").unwrap(), (1, 0));
    }

    #[test]
    fn vote_needs_exactly_one_identity_column() {
        let db = setup();
        let both = VoteInsert {
            user_id: Some("u1"),
            ..guest_vote("v1", "c1", "2026-03-01 09:00:00")
        };
        assert!(db.with_conn(|conn| insert_vote(conn, &both)).is_err());

        let neither = VoteInsert {
            guest_id: None,
            ..guest_vote("v2", "c1", "2026-03-01 09:00:00")
        };
        assert!(db.with_conn(|conn| insert_vote(conn, &neither)).is_err());
    }

    #[test]
    fn vote_on_unknown_challenge_violates_foreign_key() {
        let db = setup();
        let result = db.with_conn(|conn| insert_vote(conn, &guest_vote("v1", "missing", "2026-03-01 09:00:00")));
        assert!(result.is_err());
    }

    #[test]
    fn guest_count_is_half_open_range() {
        let db = setup();
        db.with_conn(|conn| {
            insert_vote(conn, &guest_vote("v1", "c1", "2026-03-01 00:00:00"))?;
            insert_vote(conn, &guest_vote("v2", "c2", "2026-03-02 00:00:00"))?;
            Ok(())
        })
        .unwrap();

        let count = db
            .with_conn(|conn| count_guest_votes_between(conn, "g1", "2026-03-01 00:00:00", "2026-03-02 00:00:00"))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn choices_for_returns_only_voted_challenges() {
        let db = setup();
        db.with_conn(|conn| insert_vote(conn, &guest_vote("v1", "c2", "2026-03-01 10:00:00")))
            .unwrap();

        let choices = db
            .choices_for("guest:g1", &["c1".to_string(), "c2".to_string()])
            .unwrap();
        assert_eq!(choices.len(), 1);
        assert_eq!(choices.get("c2").map(String::as_str), Some("A"));
        assert!(db.choices_for("guest:g1", &[]).unwrap().is_empty());
    }
}
