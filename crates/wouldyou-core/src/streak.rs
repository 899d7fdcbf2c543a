use anyhow::{Result, anyhow};
use chrono::{NaiveDate, TimeDelta};
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use wouldyou_db::models::{DATE_FORMAT, StreakRow, format_date};
use wouldyou_db::streaks;
use wouldyou_types::Stats;

/// A registered user's consecutive-day voting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
    pub total_votes: u32,
    pub last_vote_date: NaiveDate,
}

impl Streak {
    pub fn first(today: NaiveDate) -> Self {
        Self {
            current: 1,
            longest: 1,
            total_votes: 1,
            last_vote_date: today,
        }
    }

    /// Applies one more vote cast on `today`.
    ///
    /// Another vote on the same day only bumps the total. A vote the day after
    /// extends the streak, anything later restarts it at 1. A `today` earlier
    /// than the last vote (clock stepped back) is treated like the same day.
    pub fn record(self, today: NaiveDate) -> Self {
        let mut next = self;
        next.total_votes = self.total_votes.saturating_add(1);

        if today > self.last_vote_date {
            if today - TimeDelta::days(1) == self.last_vote_date {
                next.current = self.current.saturating_add(1);
            } else {
                next.current = 1;
            }
            next.last_vote_date = today;
        }

        next.longest = next.longest.max(next.current);
        next
    }

    pub fn stats(&self) -> Stats {
        Stats {
            current_streak: self.current,
            longest_streak: self.longest,
            total_votes: self.total_votes,
        }
    }

    fn from_row(row: &StreakRow) -> Result<Self> {
        let last_vote_date = NaiveDate::parse_from_str(&row.last_vote_date, DATE_FORMAT).map_err(|e| {
            anyhow!("Corrupt last_vote_date '{}' for user {}: {}", row.last_vote_date, row.user_id, e)
        })?;
        let current = to_u32(row.current_streak);
        Ok(Self {
            current,
            longest: to_u32(row.longest_streak).max(current),
            total_votes: to_u32(row.total_votes),
            last_vote_date,
        })
    }

    fn to_row(self, user_id: &str) -> StreakRow {
        StreakRow {
            user_id: user_id.to_string(),
            current_streak: self.current.into(),
            longest_streak: self.longest.into(),
            total_votes: self.total_votes.into(),
            last_vote_date: format_date(self.last_vote_date),
        }
    }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Reads the stored streak for a user, if any. A row that no longer parses
/// is an error, so a vote never overwrites it with a fresh streak.
pub fn load(conn: &Connection, user_id: Uuid) -> Result<Option<Streak>> {
    let row = streaks::get_streak(conn, &user_id.to_string())?;
    row.as_ref().map(Streak::from_row).transpose()
}

/// Records one vote by `user_id` on `today` and persists the new streak.
/// Called inside the vote transaction, after the vote row is in place.
pub fn record_vote(conn: &Connection, user_id: Uuid, today: NaiveDate, now: &str) -> Result<Streak> {
    let next = match load(conn, user_id)? {
        Some(prev) => prev.record(today),
        None => Streak::first(today),
    };

    let uid = user_id.to_string();
    streaks::upsert_streak(conn, &next.to_row(&uid), now)?;
    debug!("Streak for {}: current={} longest={} total={}", uid, next.current, next.longest, next.total_votes);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn consecutive_days_extend() {
        let s = Streak::first(day(1)).record(day(2)).record(day(3));
        assert_eq!((s.current, s.longest, s.total_votes), (3, 3, 3));
    }

    #[test]
    fn gap_resets_but_longest_survives() {
        let s = Streak::first(day(1)).record(day(2)).record(day(4));
        assert_eq!((s.current, s.longest, s.total_votes), (1, 2, 3));
        assert_eq!(s.last_vote_date, day(4));
    }

    #[test]
    fn same_day_votes_only_count_total() {
        let s = Streak::first(day(1)).record(day(2)).record(day(2)).record(day(2));
        assert_eq!((s.current, s.longest, s.total_votes), (2, 2, 4));
    }

    #[test]
    fn clock_going_backwards_keeps_streak() {
        let s = Streak::first(day(5)).record(day(6)).record(day(4));
        assert_eq!((s.current, s.longest), (2, 2));
        assert_eq!(s.last_vote_date, day(6));
    }

    #[test]
    fn longest_never_below_current() {
        let mut s = Streak::first(day(1));
        for d in [2, 3, 7, 8, 9, 10, 10, 20] {
            s = s.record(day(d));
            assert!(s.longest >= s.current);
        }
        assert_eq!(s.longest, 4);
        assert_eq!(s.current, 1);
    }

    #[test]
    fn corrupt_row_is_an_error_and_left_alone() {
        let db = wouldyou_db::Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        let stored = StreakRow {
            user_id: user.to_string(),
            current_streak: 4,
            longest_streak: 9,
            total_votes: 57,
            last_vote_date: "03/01/2026".into(),
        };

        db.with_conn(|conn| streaks::upsert_streak(conn, &stored, "2026-03-02 08:00:00")).unwrap();

        let err = db.with_conn(|conn| record_vote(conn, user, day(2), "2026-03-02 09:00:00"));
        assert!(err.unwrap_err().to_string().contains("Corrupt last_vote_date"));
        assert!(db.with_conn(|conn| load(conn, user)).is_err());

        let row = db.get_streak(&user.to_string()).unwrap().unwrap();
        assert_eq!((row.total_votes, row.longest_streak), (57, 9));
        assert_eq!(row.last_vote_date, "03/01/2026");
    }
}
