use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (challenges, votes, streaks)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE challenges (
                id          TEXT PRIMARY KEY,
                option_a    TEXT NOT NULL CHECK (length(option_a) > 0),
                option_b    TEXT NOT NULL CHECK (length(option_b) > 0),
                category    TEXT NOT NULL DEFAULT '',
                votes_a     INTEGER NOT NULL DEFAULT 0 CHECK (votes_a >= 0),
                votes_b     INTEGER NOT NULL DEFAULT 0 CHECK (votes_b >= 0),
                is_daily    INTEGER NOT NULL DEFAULT 0,
                daily_date  TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                deleted_at  TEXT
            );

            -- At most one live daily challenge per date
            CREATE UNIQUE INDEX idx_challenges_daily_date
                ON challenges(daily_date)
                WHERE is_daily = 1 AND deleted_at IS NULL;

            CREATE INDEX idx_challenges_category
                ON challenges(category, is_daily, created_at);

            CREATE TABLE votes (
                id            TEXT PRIMARY KEY,
                voter_key     TEXT NOT NULL,
                user_id       TEXT,
                guest_id      TEXT,
                challenge_id  TEXT NOT NULL REFERENCES challenges(id),
                choice        TEXT NOT NULL CHECK (choice IN ('A', 'B')),
                created_at    TEXT NOT NULL,
                CHECK ((user_id IS NULL) <> (guest_id IS NULL)),
                UNIQUE (voter_key, challenge_id)
            );

            CREATE INDEX idx_votes_guest_day
                ON votes(guest_id, created_at)
                WHERE guest_id IS NOT NULL;

            CREATE INDEX idx_votes_challenge
                ON votes(challenge_id);

            CREATE TABLE challenge_streaks (
                user_id         TEXT PRIMARY KEY,
                current_streak  INTEGER NOT NULL DEFAULT 0 CHECK (current_streak >= 0),
                longest_streak  INTEGER NOT NULL DEFAULT 0,
                total_votes     INTEGER NOT NULL DEFAULT 0 CHECK (total_votes >= 0),
                last_vote_date  TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                CHECK (longest_streak >= current_streak)
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
