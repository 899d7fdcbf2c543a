use anyhow::{Result, bail};
use rusqlite::{Connection, Row, params};

use crate::models::{ChallengeInsert, ChallengeRow};
use crate::{Database, OptionalExt};

const CHALLENGE_COLUMNS: &str =
    "id, option_a, option_b, category, votes_a, votes_b, is_daily, daily_date, created_at, updated_at";

impl Database {
    pub fn get_challenge(&self, id: &str) -> Result<Option<ChallengeRow>> {
        self.with_conn(|conn| get_challenge(conn, id))
    }

    pub fn get_daily_challenge(&self, date: &str) -> Result<Option<ChallengeRow>> {
        self.with_conn(|conn| get_daily_challenge(conn, date))
    }

    pub fn recent_daily_challenges(&self, limit: u32) -> Result<Vec<ChallengeRow>> {
        self.with_conn(|conn| recent_daily_challenges(conn, limit))
    }

    pub fn non_daily_by_category(&self, category: &str, limit: u32) -> Result<Vec<ChallengeRow>> {
        self.with_conn(|conn| non_daily_by_category(conn, category, limit))
    }

    pub fn distinct_categories(&self) -> Result<Vec<String>> {
        self.with_conn(distinct_categories)
    }

    /// Maintenance helper for retiring a challenge. Deleted rows disappear
    /// from every listing and reject new votes.
    pub fn soft_delete_challenge(&self, id: &str, now: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE challenges SET deleted_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![id, now],
            )?;
            Ok(changed == 1)
        })
    }
}

/// Inserts a challenge. Returns `false` when a live daily challenge already
/// holds the same date; the unique index decides, not the caller.
pub fn insert_challenge(conn: &Connection, new: &ChallengeInsert<'_>) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO challenges (id, option_a, option_b, category, is_daily, daily_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT DO NOTHING",
        params![
            new.id,
            new.option_a,
            new.option_b,
            new.category,
            new.daily_date.is_some(),
            new.daily_date,
            new.created_at,
        ],
    )?;
    Ok(changed == 1)
}

pub fn get_challenge(conn: &Connection, id: &str) -> Result<Option<ChallengeRow>> {
    let sql = format!(
        "SELECT {} FROM challenges WHERE id = ?1 AND deleted_at IS NULL",
        CHALLENGE_COLUMNS
    );
    conn.query_row(&sql, [id], map_challenge).optional()
}

pub fn get_daily_challenge(conn: &Connection, date: &str) -> Result<Option<ChallengeRow>> {
    let sql = format!(
        "SELECT {} FROM challenges WHERE is_daily = 1 AND daily_date = ?1 AND deleted_at IS NULL",
        CHALLENGE_COLUMNS
    );
    conn.query_row(&sql, [date], map_challenge).optional()
}

/// Daily challenges dated strictly after `after` (used for the rotation window).
pub fn daily_challenges_after(conn: &Connection, after: &str) -> Result<Vec<ChallengeRow>> {
    let sql = format!(
        "SELECT {} FROM challenges
         WHERE is_daily = 1 AND daily_date > ?1 AND deleted_at IS NULL
         ORDER BY daily_date",
        CHALLENGE_COLUMNS
    );
    collect(conn, &sql, params![after])
}

pub fn recent_daily_challenges(conn: &Connection, limit: u32) -> Result<Vec<ChallengeRow>> {
    let sql = format!(
        "SELECT {} FROM challenges
         WHERE is_daily = 1 AND deleted_at IS NULL
         ORDER BY daily_date DESC
         LIMIT ?1",
        CHALLENGE_COLUMNS
    );
    collect(conn, &sql, params![limit])
}

pub fn non_daily_by_category(conn: &Connection, category: &str, limit: u32) -> Result<Vec<ChallengeRow>> {
    let sql = format!(
        "SELECT {} FROM challenges
         WHERE category = ?1 AND is_daily = 0 AND deleted_at IS NULL
         ORDER BY created_at DESC, id
         LIMIT ?2",
        CHALLENGE_COLUMNS
    );
    collect(conn, &sql, params![category, limit])
}

/// Ids of non-daily challenges, oldest first. With a voter key, challenges
/// that voter has already voted on are left out.
pub fn non_daily_ids(conn: &Connection, unseen_by: Option<&str>) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT c.id FROM challenges c
         WHERE c.is_daily = 0 AND c.deleted_at IS NULL
           AND (?1 IS NULL OR NOT EXISTS (
               SELECT 1 FROM votes v WHERE v.challenge_id = c.id AND v.voter_key = ?1
           ))
         ORDER BY c.created_at, c.id",
    )?;
    let ids = stmt
        .query_map([unseen_by], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn count_non_daily(conn: &Connection, category: Option<&str>) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM challenges
         WHERE is_daily = 0 AND deleted_at IS NULL AND (?1 IS NULL OR category = ?1)",
        [category],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Counts every live challenge in a category, daily ones included.
pub fn count_in_category(conn: &Connection, category: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM challenges WHERE category = ?1 AND deleted_at IS NULL",
        [category],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn distinct_categories(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT category FROM challenges
         WHERE deleted_at IS NULL AND category <> ''
         ORDER BY category",
    )?;
    let categories = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(categories)
}

/// Adds `by` to one tally in place. Returns the number of rows touched
/// (0 when the challenge does not exist or is deleted).
pub fn increment_tally(conn: &Connection, id: &str, choice: &str, by: i64, now: &str) -> Result<usize> {
    let sql = match choice {
        "A" => "UPDATE challenges SET votes_a = votes_a + ?2, updated_at = ?3 WHERE id = ?1 AND deleted_at IS NULL",
        "B" => "UPDATE challenges SET votes_b = votes_b + ?2, updated_at = ?3 WHERE id = ?1 AND deleted_at IS NULL",
        other => bail!("Unknown tally column for choice {:?}", other),
    };
    Ok(conn.execute(sql, params![id, by, now])?)
}

fn collect(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<ChallengeRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_challenge)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_challenge(row: &Row<'_>) -> rusqlite::Result<ChallengeRow> {
    Ok(ChallengeRow {
        id: row.get(0)?,
        option_a: row.get(1)?,
        option_b: row.get(2)?,
        category: row.get(3)?,
        votes_a: row.get(4)?,
        votes_b: row.get(5)?,
        is_daily: row.get(6)?,
        daily_date: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(db: &Database, id: &str, category: &str, daily_date: Option<&str>) -> bool {
        db.with_conn(|conn| {
            insert_challenge(
                conn,
                &ChallengeInsert {
                    id,
                    option_a: "Be able to fly",
                    option_b: "Be able to read minds",
                    category,
                    daily_date,
                    created_at: "2026-03-01 08:00:00",
                },
            )
        })
        .unwrap()
    }

    #[test]
    fn second_daily_for_same_date_is_rejected_by_index() {
        let db = Database::open_in_memory().unwrap();
        assert!(insert(&db, "c1", "life", Some("2026-03-01")));
        assert!(!insert(&db, "c2", "life", Some("2026-03-01")));
        assert!(insert(&db, "c3", "life", Some("2026-03-02")));

        let daily = db.get_daily_challenge("2026-03-01").unwrap().unwrap();
        assert_eq!(daily.id, "c1");
    }

    #[test]
    fn soft_deleted_daily_frees_its_date() {
        let db = Database::open_in_memory().unwrap();
        assert!(insert(&db, "c1", "life", Some("2026-03-01")));
        assert!(db.soft_delete_challenge("c1", "2026-03-01 09:00:00").unwrap());
        assert!(db.get_challenge("c1").unwrap().is_none());
        assert!(insert(&db, "c2", "life", Some("2026-03-01")));
    }

    #[test]
    fn increment_is_in_place() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, "c1", "life", None);

        db.with_conn(|conn| {
            increment_tally(conn, "c1", "A", 1, "2026-03-01 08:01:00")?;
            increment_tally(conn, "c1", "A", 2, "2026-03-01 08:02:00")?;
            increment_tally(conn, "c1", "B", 1, "2026-03-01 08:03:00")?;
            Ok(())
        })
        .unwrap();

        let row = db.get_challenge("c1").unwrap().unwrap();
        assert_eq!((row.votes_a, row.votes_b), (3, 1));
        assert_eq!(row.updated_at, "2026-03-01 08:03:00");
    }

    #[test]
    fn increment_rejects_unknown_choice_and_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let touched = db
            .with_conn(|conn| increment_tally(conn, "nope", "A", 1, "2026-03-01 08:00:00"))
            .unwrap();
        assert_eq!(touched, 0);
        assert!(
            db.with_conn(|conn| increment_tally(conn, "nope", "C", 1, "2026-03-01 08:00:00"))
                .is_err()
        );
    }

    #[test]
    fn category_listing_excludes_daily_rows() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, "d1", "deep", Some("2026-03-01"));
        insert(&db, "n1", "deep", None);
        insert(&db, "n2", "tech", None);

        let rows = db.non_daily_by_category("deep", 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "n1");
        assert_eq!(db.distinct_categories().unwrap(), vec!["deep", "tech"]);

        let (deep_all, non_daily) = db
            .with_conn(|conn| Ok((count_in_category(conn, "deep")?, count_non_daily(conn, None)?)))
            .unwrap();
        assert_eq!(deep_all, 2);
        assert_eq!(non_daily, 2);
    }
}
