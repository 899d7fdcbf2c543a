use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the two sides of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the exact strings "A" and "B" are accepted.
impl FromStr for Choice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            _ => Err(()),
        }
    }
}

/// Who is making a request.
///
/// Guest tokens are opaque and unauthenticated. They identify a device for
/// rate limiting and vote dedup, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Anonymous,
    User(Uuid),
    Guest(String),
}

impl Identity {
    /// Builds an identity from whatever the transport layer resolved.
    /// A registered user wins over a guest token; a blank token is ignored.
    pub fn from_parts(user_id: Option<Uuid>, guest_token: Option<&str>) -> Self {
        match (user_id, guest_token.map(str::trim)) {
            (Some(id), _) => Self::User(id),
            (None, Some(token)) if !token.is_empty() => Self::Guest(token.to_string()),
            _ => Self::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(*id),
            _ => None,
        }
    }

    pub fn guest_token(&self) -> Option<&str> {
        match self {
            Self::Guest(token) => Some(token),
            _ => None,
        }
    }

    /// Key under which the vote ledger dedups this identity's votes.
    /// `None` for anonymous callers, who cannot vote.
    pub fn voter_key(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(format!("user:{}", id)),
            Self::Guest(token) => Some(format!("guest:{}", token)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub option_a: String,
    pub option_b: String,
    pub category: String,
    pub votes_a: u64,
    pub votes_b: u64,
    pub is_daily: bool,
    pub daily_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    pub fn total_votes(&self) -> u64 {
        self.votes_a + self.votes_b
    }

    /// Integer-truncated share of each option. Both are 0 with no votes, and
    /// the pair may sum to 99 because each side truncates independently.
    pub fn percentages(&self) -> (u64, u64) {
        let total = self.total_votes();
        if total == 0 {
            return (0, 0);
        }
        (self.votes_a * 100 / total, self.votes_b * 100 / total)
    }

    /// Key used to detect a repeated option pair in the daily rotation.
    pub fn pair_key(&self) -> String {
        pair_key(&self.option_a, &self.option_b)
    }
}

pub fn pair_key(option_a: &str, option_b: &str) -> String {
    format!("{}|{}", option_a, option_b)
}

/// A challenge that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChallenge {
    pub option_a: String,
    pub option_b: String,
    pub category: String,
}

impl NewChallenge {
    pub fn new(option_a: &str, option_b: &str, category: &str) -> Self {
        Self {
            option_a: option_a.to_string(),
            option_b: option_b.to_string(),
            category: category.to_string(),
        }
    }

    pub fn pair_key(&self) -> String {
        pair_key(&self.option_a, &self.option_b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
    pub challenge_id: Uuid,
    pub choice: Choice,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_votes: u32,
}

/// A challenge as shown to one caller: their own choice plus the tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeView {
    pub challenge: Challenge,
    pub user_choice: Option<Choice>,
    pub percent_a: u64,
    pub percent_b: u64,
    pub total_votes: u64,
}

impl ChallengeView {
    pub fn new(challenge: Challenge, user_choice: Option<Choice>) -> Self {
        let (percent_a, percent_b) = challenge.percentages();
        let total_votes = challenge.total_votes();
        Self {
            challenge,
            user_choice,
            percent_a,
            percent_b,
            total_votes,
        }
    }
}
