use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use wouldyou_db::Database;
use wouldyou_db::challenges;
use wouldyou_db::models::{ChallengeInsert, format_date, format_timestamp};
use wouldyou_types::{Challenge, NewChallenge};

use crate::clock::{Clock, SystemClock};
use crate::convert::challenge_from_row;
use crate::error::ChallengeError;
use crate::generator::QuestionGenerator;
use crate::pool::{self, DAILY_POOL};
use crate::rotation;

/// Tunables for the challenge core.
#[derive(Debug, Clone)]
pub struct ChallengeSettings {
    /// Votes an anonymous guest may cast per calendar day.
    pub guest_daily_limit: u32,
    /// Daily challenges from this many trailing days block a repeat pair.
    pub rotation_window_days: u32,
    /// Browsing a category with fewer non-daily challenges asks for more.
    pub category_floor: u32,
    /// How many challenges to request when a category runs low.
    pub top_up_batch: usize,
    /// Startup top-up target per default category.
    pub category_minimum: u32,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            guest_daily_limit: 3,
            rotation_window_days: 30,
            category_floor: 5,
            top_up_batch: 10,
            category_minimum: 10,
        }
    }
}

pub struct ChallengeService<G> {
    pub(crate) db: Arc<Database>,
    pub(crate) generator: G,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: ChallengeSettings,
    rng: Mutex<StdRng>,
}

impl<G: QuestionGenerator> ChallengeService<G> {
    pub fn new(db: Arc<Database>, generator: G) -> Self {
        Self {
            db,
            generator,
            clock: Arc::new(SystemClock),
            settings: ChallengeSettings::default(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the random source, e.g. with a seeded one for reproducible picks.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn with_settings(mut self, settings: ChallengeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &ChallengeSettings {
        &self.settings
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn generator_available(&self) -> bool {
        self.generator.is_available()
    }

    /// Current time, truncated to the second precision the store keeps.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(0)
    }

    /// A poisoned RNG is still a usable RNG.
    pub(crate) fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns today's daily challenge, creating it on the first call of the day.
    ///
    /// The new pair is drawn from the built-in pool, skipping pairs used as a
    /// daily challenge inside the rotation window. Concurrent first callers
    /// converge on one row through the store's unique daily-date index.
    pub fn daily_challenge(&self) -> Result<Challenge, ChallengeError> {
        let now = self.now();
        let today = now.date_naive();
        let date = format_date(today);

        if let Some(row) = self.db.get_daily_challenge(&date)? {
            return Ok(challenge_from_row(row)?);
        }

        let window_start = today - TimeDelta::days(i64::from(self.settings.rotation_window_days));

        let row = self.db.with_tx(|tx| -> Result<_, ChallengeError> {
            if let Some(row) = challenges::get_daily_challenge(tx, &date)? {
                return Ok(row);
            }

            let recent = challenges::daily_challenges_after(tx, &format_date(window_start))?;
            let used: HashSet<String> = recent
                .iter()
                .map(|r| wouldyou_types::models::pair_key(&r.option_a, &r.option_b))
                .collect();

            let picked = rotation::pick_candidate(DAILY_POOL, &used, &mut *self.rng())
                .ok_or(ChallengeError::NoChallengesAvailable)?;

            let id = Uuid::new_v4().to_string();
            let inserted = challenges::insert_challenge(
                tx,
                &ChallengeInsert {
                    id: &id,
                    option_a: picked.option_a,
                    option_b: picked.option_b,
                    category: picked.category,
                    daily_date: Some(&date),
                    created_at: &format_timestamp(now),
                },
            )?;

            if inserted {
                info!("Daily challenge for {} created: {} ({})", date, id, picked.category);
            } else {
                warn!("Daily challenge for {} already created by a concurrent request", date);
            }

            challenges::get_daily_challenge(tx, &date)?.ok_or_else(|| {
                ChallengeError::StorageFailure(anyhow::anyhow!("Daily challenge for {} vanished after insert", date))
            })
        })?;

        Ok(challenge_from_row(row)?)
    }

    /// Persists generated (or pool) challenges as non-daily rows.
    pub(crate) fn store_new_challenges(&self, batch: &[NewChallenge]) -> Result<Vec<Challenge>> {
        let created_at = format_timestamp(self.now());

        let ids = self.db.with_tx(|tx| {
            let mut ids = Vec::with_capacity(batch.len());
            for new in batch {
                let option_a = new.option_a.trim();
                let option_b = new.option_b.trim();
                if option_a.is_empty() || option_b.is_empty() {
                    continue;
                }
                let id = Uuid::new_v4().to_string();
                challenges::insert_challenge(
                    tx,
                    &ChallengeInsert {
                        id: &id,
                        option_a,
                        option_b,
                        category: new.category.trim(),
                        daily_date: None,
                        created_at: &created_at,
                    },
                )?;
                ids.push(id);
            }
            Ok::<_, anyhow::Error>(ids)
        })?;

        let mut stored = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = self.db.get_challenge(&id)? {
                stored.push(challenge_from_row(row)?);
            }
        }
        Ok(stored)
    }

    /// Seeds a category from the built-in pool the first time it is used.
    pub(crate) fn ensure_category_seeded(&self, category: &str) -> Result<usize> {
        let created_at = format_timestamp(self.now());
        self.db.with_tx(|tx| seed_category(tx, category, &created_at))
    }
}

fn seed_category(conn: &Connection, category: &str, created_at: &str) -> Result<usize> {
    if challenges::count_non_daily(conn, Some(category))? > 0 {
        return Ok(0);
    }

    let mut seeded = 0;
    for entry in pool::entries_in(category) {
        let id = Uuid::new_v4().to_string();
        challenges::insert_challenge(
            conn,
            &ChallengeInsert {
                id: &id,
                option_a: entry.option_a,
                option_b: entry.option_b,
                category: entry.category,
                daily_date: None,
                created_at,
            },
        )?;
        seeded += 1;
    }

    if seeded > 0 {
        info!("Seeded {} pool challenges for category {}", seeded, category);
    }
    Ok(seeded)
}
