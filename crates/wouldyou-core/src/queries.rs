use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{info, warn};
use uuid::Uuid;

use wouldyou_db::challenges;
use wouldyou_types::{Challenge, ChallengeView, Identity, Stats};

use crate::convert::{challenge_from_row, challenges_from_rows};
use crate::error::ChallengeError;
use crate::generator::QuestionGenerator;
use crate::pool::DEFAULT_CATEGORIES;
use crate::rotation;
use crate::service::ChallengeService;
use crate::streak;

impl<G: QuestionGenerator> ChallengeService<G> {
    /// Streak counters for a user; all zero before their first vote.
    pub fn stats(&self, user_id: Uuid) -> Result<Stats, ChallengeError> {
        let record = self.db.with_conn(|conn| streak::load(conn, user_id))?;
        Ok(record.map(|s| s.stats()).unwrap_or_default())
    }

    /// Past daily challenges, newest first, with the user's choice on each.
    pub fn history(&self, user_id: Uuid, limit: u32) -> Result<Vec<ChallengeView>, ChallengeError> {
        let rows = self.db.recent_daily_challenges(limit)?;
        let daily = challenges_from_rows(rows)?;
        Ok(self.views_for(&Identity::User(user_id), daily)?)
    }

    /// Distinct categories in the store, or the default set on an empty store.
    pub fn categories(&self) -> Result<Vec<String>, ChallengeError> {
        let categories = self.db.distinct_categories()?;
        if categories.is_empty() {
            return Ok(DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect());
        }
        Ok(categories)
    }

    fn unseen_ids(&self, voter_key: Option<&str>) -> Result<Vec<String>> {
        self.db.with_conn(|conn| challenges::non_daily_ids(conn, voter_key))
    }

    /// Attaches the caller's choices and percentages, one ledger query in total.
    fn views_for(&self, identity: &Identity, items: Vec<Challenge>) -> Result<Vec<ChallengeView>> {
        let choices: HashMap<String, String> = match identity.voter_key() {
            Some(key) => {
                let ids: Vec<String> = items.iter().map(|c| c.id.to_string()).collect();
                self.db.choices_for(&key, &ids)?
            }
            None => HashMap::new(),
        };

        Ok(items
            .into_iter()
            .map(|c| {
                let user_choice = choices.get(&c.id.to_string()).and_then(|s| s.parse().ok());
                ChallengeView::new(c, user_choice)
            })
            .collect())
    }
}

impl<G: QuestionGenerator + 'static> ChallengeService<G> {
    /// Picks a non-daily challenge the caller has not voted on yet. When they
    /// have seen everything, any non-daily challenge may come back.
    pub async fn random_challenge(self: &Arc<Self>, identity: &Identity) -> Result<Challenge, ChallengeError> {
        let voter_key = identity.voter_key();

        let key = voter_key.clone();
        let (ids, empty_store) = self
            .off_runtime(move |svc| {
                for category in DEFAULT_CATEGORIES {
                    svc.ensure_category_seeded(category)?;
                }
                let ids = svc.unseen_ids(key.as_deref())?;
                let empty_store = ids.is_empty() && svc.db.with_conn(|conn| challenges::count_non_daily(conn, None))? == 0;
                Ok((ids, empty_store))
            })
            .await?;

        let refresh = if empty_store {
            if !self.generator.is_available() {
                return Err(ChallengeError::NoChallengesAvailable);
            }

            info!("No challenges found, generating a general batch");
            if let Err(e) = self.top_up("general", self.settings.top_up_batch).await {
                warn!("Failed to generate challenges: {}", e);
                return Err(ChallengeError::NoChallengesAvailable);
            }
            true
        } else {
            false
        };

        self.off_runtime(move |svc| {
            let mut ids = if refresh { svc.unseen_ids(voter_key.as_deref())? } else { ids };
            if ids.is_empty() {
                ids = svc.unseen_ids(None)?;
            }

            let picked = rotation::pick(ids, &mut *svc.rng()).ok_or(ChallengeError::NoChallengesAvailable)?;
            let row = svc
                .db
                .get_challenge(&picked)?
                .ok_or(ChallengeError::NoChallengesAvailable)?;
            Ok(challenge_from_row(row)?)
        })
        .await
    }

    /// Non-daily challenges in a category, newest first. Category names are
    /// matched trimmed and lower-cased, the way generated rows are stored.
    ///
    /// When the category holds fewer than the configured floor, the generator
    /// is asked for a batch first. A generator failure is logged and the
    /// listing is served from what already exists.
    pub async fn challenges_by_category(
        self: &Arc<Self>,
        category: &str,
        identity: &Identity,
        limit: u32,
    ) -> Result<Vec<ChallengeView>, ChallengeError> {
        let category = category.trim().to_lowercase();

        let name = category.clone();
        let available = self
            .off_runtime(move |svc| {
                svc.ensure_category_seeded(&name)?;
                Ok(svc.db.with_conn(|conn| challenges::count_non_daily(conn, Some(&name)))?)
            })
            .await?;

        if available < i64::from(self.settings.category_floor) && self.generator.is_available() {
            info!("Low challenge count for category {} ({}), generating more", category, available);
            if let Err(e) = self.top_up(&category, self.settings.top_up_batch).await {
                warn!("Failed to generate challenges for category {}: {}", category, e);
            }
        }

        let identity = identity.clone();
        self.off_runtime(move |svc| {
            let rows = svc.db.non_daily_by_category(&category, limit)?;
            let listed = challenges_from_rows(rows)?;
            Ok(svc.views_for(&identity, listed)?)
        })
        .await
    }

    /// Brings each default category up to the configured minimum using the
    /// generator. Returns how many challenges were added.
    pub async fn ensure_minimum_challenges(self: &Arc<Self>) -> Result<usize, ChallengeError> {
        if !self.generator.is_available() {
            return Ok(0);
        }

        let minimum = i64::from(self.settings.category_minimum);
        let mut added = 0;

        for category in DEFAULT_CATEGORIES {
            let count = self
                .off_runtime(move |svc| Ok(svc.db.with_conn(|conn| challenges::count_in_category(conn, category))?))
                .await?;
            if count >= minimum {
                continue;
            }

            let needed = (minimum - count) as usize;
            info!("Category {} has {} challenges, generating {} more", category, count, needed);
            match self.top_up(category, needed).await {
                Ok(stored) => added += stored.len(),
                Err(e) => warn!("Failed to generate for {}: {}", category, e),
            }
        }

        Ok(added)
    }

    async fn top_up(self: &Arc<Self>, category: &str, count: usize) -> Result<Vec<Challenge>> {
        let batch = self.generator.generate_batch(category, count).await?;
        let stored = self
            .off_runtime(move |svc| Ok(svc.store_new_challenges(&batch)?))
            .await?;
        info!("Stored {} generated challenges for category {}", stored.len(), category);
        Ok(stored)
    }

    /// Runs store work on the blocking pool. Only generator calls are awaited
    /// on the runtime itself.
    async fn off_runtime<T, F>(self: &Arc<Self>, f: F) -> Result<T, ChallengeError>
    where
        F: FnOnce(&Self) -> Result<T, ChallengeError> + Send + 'static,
        T: Send + 'static,
    {
        let svc = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&svc))
            .await
            .map_err(|e| ChallengeError::StorageFailure(anyhow!("store task failed: {}", e)))?
    }
}
