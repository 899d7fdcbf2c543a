use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use rusqlite::Connection;

use wouldyou_db::models::TIMESTAMP_FORMAT;
use wouldyou_db::votes;

/// Votes cast by `guest_token` during the UTC calendar day `today`.
/// The ledger is the only state; there is no separate counter.
pub(crate) fn count_votes_today(conn: &Connection, guest_token: &str, today: NaiveDate) -> Result<u32> {
    let start = today.and_time(NaiveTime::MIN);
    let end = start + TimeDelta::days(1);

    let count = votes::count_guest_votes_between(
        conn,
        guest_token,
        &start.format(TIMESTAMP_FORMAT).to_string(),
        &end.format(TIMESTAMP_FORMAT).to_string(),
    )?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}
