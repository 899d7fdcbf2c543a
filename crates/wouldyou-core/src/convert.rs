use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use wouldyou_db::models::{ChallengeRow, DATE_FORMAT, TIMESTAMP_FORMAT, VoteRow};
use wouldyou_types::{Challenge, Choice, Vote};

pub(crate) fn challenge_from_row(row: ChallengeRow) -> Result<Challenge> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow!("Corrupt challenge id '{}': {}", row.id, e))?;

    let daily_date = match (row.is_daily, row.daily_date.as_deref()) {
        (true, Some(date)) => NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|e| warn!("Corrupt daily_date '{}' on challenge '{}': {}", date, row.id, e))
            .ok(),
        _ => None,
    };

    Ok(Challenge {
        id,
        option_a: row.option_a,
        option_b: row.option_b,
        category: row.category,
        votes_a: row.votes_a.max(0) as u64,
        votes_b: row.votes_b.max(0) as u64,
        is_daily: row.is_daily,
        daily_date,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

pub(crate) fn challenges_from_rows(rows: Vec<ChallengeRow>) -> Result<Vec<Challenge>> {
    rows.into_iter().map(challenge_from_row).collect()
}

pub(crate) fn vote_from_row(row: VoteRow) -> Result<Vote> {
    let choice: Choice = row
        .choice
        .parse()
        .map_err(|_| anyhow!("Corrupt choice '{}' on vote '{}'", row.choice, row.id))?;

    Ok(Vote {
        id: parse_uuid(&row.id, "vote id")?,
        user_id: row.user_id.as_deref().map(|u| parse_uuid(u, "user_id")).transpose()?,
        guest_id: row.guest_id,
        challenge_id: parse_uuid(&row.challenge_id, "challenge_id")?,
        choice,
        created_at: parse_timestamp(&row.created_at),
    })
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|e| anyhow!("Corrupt {} '{}': {}", what, value, e))
}

/// SQLite timestamps carry no zone; they are always written as UTC.
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}
