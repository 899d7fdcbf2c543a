//! Database row types. Timestamps are UTC text in SQLite's
//! `YYYY-MM-DD HH:MM:SS` layout and dates are `YYYY-MM-DD`, so both order
//! correctly as plain strings.
use chrono::{DateTime, NaiveDate, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone)]
pub struct ChallengeRow {
    pub id: String,
    pub option_a: String,
    pub option_b: String,
    pub category: String,
    pub votes_a: i64,
    pub votes_b: i64,
    pub is_daily: bool,
    pub daily_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Values for a new challenge row. `daily_date` set means a daily challenge.
pub struct ChallengeInsert<'a> {
    pub id: &'a str,
    pub option_a: &'a str,
    pub option_b: &'a str,
    pub category: &'a str,
    pub daily_date: Option<&'a str>,
    pub created_at: &'a str,
}

#[derive(Debug, Clone)]
pub struct VoteRow {
    pub id: String,
    pub user_id: Option<String>,
    pub guest_id: Option<String>,
    pub challenge_id: String,
    pub choice: String,
    pub created_at: String,
}

pub struct VoteInsert<'a> {
    pub id: &'a str,
    pub voter_key: &'a str,
    pub user_id: Option<&'a str>,
    pub guest_id: Option<&'a str>,
    pub challenge_id: &'a str,
    pub choice: &'a str,
    pub created_at: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakRow {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_votes: i64,
    pub last_vote_date: String,
}
