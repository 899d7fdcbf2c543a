pub mod challenges;
pub mod error;
pub mod health;
pub mod middleware;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use wouldyou_core::QuestionGenerator;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All HTTP routes. Every challenge route sees the caller's identity;
/// stats and history additionally require a registered user.
pub fn router<G: QuestionGenerator + 'static>(state: AppState<G>) -> Router {
    let user_routes = Router::new()
        .route("/api/challenges/stats", get(challenges::stats::<G>))
        .route("/api/challenges/history", get(challenges::history::<G>))
        .route_layer(axum_middleware::from_fn(middleware::require_user));

    let challenge_routes = Router::new()
        .route("/api/challenges/daily", get(challenges::daily::<G>))
        .route("/api/challenges/vote", post(challenges::vote::<G>))
        .route("/api/challenges/random", get(challenges::random::<G>))
        .route("/api/challenges/categories", get(challenges::categories::<G>))
        .route("/api/challenges/category/{category}", get(challenges::by_category::<G>))
        .route("/api/challenges/{id}/vote", get(challenges::my_vote::<G>))
        .merge(user_routes)
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::identify::<G>));

    Router::new()
        .route("/api/health", get(health::health::<G>))
        .merge(challenge_routes)
        .with_state(state)
}
