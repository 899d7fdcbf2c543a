use tracing::info;
use uuid::Uuid;

use wouldyou_db::models::{VoteInsert, format_timestamp};
use wouldyou_db::{challenges, votes};
use wouldyou_types::{Choice, Identity, Vote};

use crate::convert::vote_from_row;
use crate::error::ChallengeError;
use crate::generator::QuestionGenerator;
use crate::service::ChallengeService;
use crate::{guest_limit, streak};

impl<G: QuestionGenerator> ChallengeService<G> {
    /// Records `identity`'s vote on a challenge.
    ///
    /// Checks run in order: choice, identity, guest daily limit, duplicate.
    /// The ledger insert, the tally increment and the streak update commit
    /// together or not at all.
    pub fn vote(&self, identity: &Identity, challenge_id: Uuid, choice: &str) -> Result<Vote, ChallengeError> {
        let choice: Choice = choice.parse().map_err(|_| ChallengeError::InvalidChoice)?;
        let voter_key = identity.voter_key().ok_or(ChallengeError::AuthenticationRequired)?;

        let now = self.now();
        let today = now.date_naive();
        let created_at = format_timestamp(now);
        let cid = challenge_id.to_string();

        let vote = Vote {
            id: Uuid::new_v4(),
            user_id: identity.user_id(),
            guest_id: identity.guest_token().map(str::to_string),
            challenge_id,
            choice,
            created_at: now,
        };

        self.db.with_tx(|tx| -> Result<(), ChallengeError> {
            if let Some(token) = identity.guest_token() {
                let cast = guest_limit::count_votes_today(tx, token, today)?;
                if cast >= self.settings.guest_daily_limit {
                    return Err(ChallengeError::GuestLimitExceeded);
                }
            }

            if votes::get_vote(tx, &voter_key, &cid)?.is_some() {
                return Err(ChallengeError::AlreadyVoted);
            }

            if challenges::get_challenge(tx, &cid)?.is_none() {
                return Err(ChallengeError::ChallengeNotFound);
            }

            let user_id = vote.user_id.map(|u| u.to_string());
            let inserted = votes::insert_vote(
                tx,
                &VoteInsert {
                    id: &vote.id.to_string(),
                    voter_key: &voter_key,
                    user_id: user_id.as_deref(),
                    guest_id: vote.guest_id.as_deref(),
                    challenge_id: &cid,
                    choice: choice.as_str(),
                    created_at: &created_at,
                },
            )?;
            if !inserted {
                return Err(ChallengeError::AlreadyVoted);
            }

            if challenges::increment_tally(tx, &cid, choice.as_str(), 1, &created_at)? != 1 {
                return Err(ChallengeError::ChallengeNotFound);
            }

            if let Some(uid) = vote.user_id {
                streak::record_vote(tx, uid, today, &created_at)?;
            }

            Ok(())
        })?;

        info!("Vote {} recorded: {} chose {} on {}", vote.id, voter_key, choice, challenge_id);
        Ok(vote)
    }

    /// The caller's vote on a challenge, if they have cast one.
    pub fn vote_of(&self, identity: &Identity, challenge_id: Uuid) -> Result<Option<Vote>, ChallengeError> {
        let Some(voter_key) = identity.voter_key() else {
            return Ok(None);
        };

        match self.db.get_vote(&voter_key, &challenge_id.to_string())? {
            Some(row) => Ok(Some(vote_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Votes `guest_token` has cast today. Only the ledger is consulted.
    pub fn guest_votes_today(&self, guest_token: &str) -> Result<u32, ChallengeError> {
        let today = self.clock.today();
        Ok(self
            .db
            .with_conn(|conn| guest_limit::count_votes_today(conn, guest_token, today))?)
    }
}
