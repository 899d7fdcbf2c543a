use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChallengeView;

// -- JWT Claims --

/// Claims carried by access tokens. Tokens are issued elsewhere; this service
/// only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Challenges --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub challenge_id: String,
    pub choice: String,
}

#[derive(Debug, Serialize)]
pub struct DailyChallengeResponse {
    #[serde(flatten)]
    pub view: ChallengeView,
    pub user_voted: bool,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let total = data.len();
        Self { data, total }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: bool,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub db: String,
}
