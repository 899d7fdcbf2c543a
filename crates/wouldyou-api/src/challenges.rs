use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use wouldyou_core::{ChallengeError, QuestionGenerator};
use wouldyou_types::api::{DailyChallengeResponse, LimitQuery, ListResponse, VoteRequest};
use wouldyou_types::{ChallengeView, Identity};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

fn page_size(query: &LimitQuery) -> u32 {
    query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn parse_challenge_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid challenge id".into()))
}

/// GET /api/challenges/daily
pub async fn daily<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<DailyChallengeResponse>, ApiError> {
    let view = state
        .blocking(move |svc| {
            let challenge = svc.daily_challenge()?;
            let vote = svc.vote_of(&identity, challenge.id)?;
            Ok(ChallengeView::new(challenge, vote.map(|v| v.choice)))
        })
        .await?;

    let user_voted = view.user_choice.is_some();
    Ok(Json(DailyChallengeResponse { view, user_voted }))
}

/// POST /api/challenges/vote
pub async fn vote<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let challenge_id = parse_challenge_id(&req.challenge_id)?;

    let vote = state
        .blocking(move |svc| svc.vote(&identity, challenge_id, &req.choice))
        .await?;

    Ok((StatusCode::CREATED, Json(vote)))
}

/// GET /api/challenges/random
pub async fn random<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ChallengeView>, ApiError> {
    let challenge = state.deadline(state.service.random_challenge(&identity)).await?;
    Ok(Json(ChallengeView::new(challenge, None)))
}

/// GET /api/challenges/categories
pub async fn categories<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
) -> Result<Json<ListResponse<String>>, ApiError> {
    let categories = state.blocking(|svc| svc.categories()).await?;
    Ok(Json(ListResponse::new(categories)))
}

/// GET /api/challenges/category/{category}
pub async fn by_category<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(category): Path<String>,
    Query(query): Query<LimitQuery>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ListResponse<ChallengeView>>, ApiError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(ApiError::BadRequest("category is required".into()));
    }

    let limit = page_size(&query);
    let views = state
        .deadline(state.service.challenges_by_category(category, &identity, limit))
        .await?;
    Ok(Json(ListResponse::new(views)))
}

/// GET /api/challenges/{id}/vote
pub async fn my_vote<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let challenge_id = parse_challenge_id(&id)?;
    let vote = state
        .blocking(move |svc| svc.vote_of(&identity, challenge_id))
        .await?
        .ok_or(ApiError::VoteNotFound)?;
    Ok(Json(vote))
}

/// GET /api/challenges/stats (registered users only)
pub async fn stats<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity
        .user_id()
        .ok_or(ApiError::Challenge(ChallengeError::AuthenticationRequired))?;
    let stats = state.blocking(move |svc| svc.stats(user_id)).await?;
    Ok(Json(stats))
}

/// GET /api/challenges/history (registered users only)
pub async fn history<G: QuestionGenerator + 'static>(
    State(state): State<AppState<G>>,
    Query(query): Query<LimitQuery>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ListResponse<ChallengeView>>, ApiError> {
    let user_id = identity
        .user_id()
        .ok_or(ApiError::Challenge(ChallengeError::AuthenticationRequired))?;
    let limit = page_size(&query);
    let views = state.blocking(move |svc| svc.history(user_id, limit)).await?;
    Ok(Json(ListResponse::new(views)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(page_size(&LimitQuery::default()), 20);
        assert_eq!(page_size(&LimitQuery { limit: Some(5) }), 5);
        assert_eq!(page_size(&LimitQuery { limit: Some(1000) }), 100);
        assert_eq!(page_size(&LimitQuery { limit: Some(0) }), 1);
    }

    #[test]
    fn challenge_id_must_be_uuid() {
        assert!(parse_challenge_id("not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_challenge_id(&format!(" {} ", id)).unwrap(), id);
    }
}
