use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use wouldyou_core::ChallengeError;
use wouldyou_types::Identity;
use wouldyou_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the caller's identity from an `Authorization` header value.
///
/// `Bearer <jwt>` with a valid token is a registered user, `Guest <token>` is
/// a guest. Anything else, including an invalid or expired JWT, is anonymous.
pub fn resolve_identity(auth_header: Option<&str>, jwt_secret: &str) -> Identity {
    let Some(value) = auth_header else {
        return Identity::Anonymous;
    };

    if let Some(token) = value.strip_prefix("Guest ") {
        return Identity::from_parts(None, Some(token.trim()));
    }

    if let Some(token) = value.strip_prefix("Bearer ") {
        match decode::<Claims>(
            token.trim(),
            &DecodingKey::from_secret(jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => return Identity::User(data.claims.sub),
            Err(e) => debug!("Rejected bearer token: {}", e),
        }
    }

    Identity::Anonymous
}

/// Attaches an [`Identity`] to every request. Never rejects.
pub async fn identify<G: Send + Sync + 'static>(
    State(state): State<AppState<G>>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let identity = resolve_identity(auth_header, &state.jwt_secret);

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Lets only registered users through. Must run after [`identify`].
pub async fn require_user(req: Request, next: Next) -> Response {
    match req.extensions().get::<Identity>() {
        Some(Identity::User(_)) => next.run(req).await,
        _ => ApiError::from(ChallengeError::AuthenticationRequired).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    use super::*;

    const SECRET: &str = "test-secret";

    fn token(sub: Uuid, exp: usize, secret: &str) -> String {
        encode(&Header::default(), &Claims { sub, exp }, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn far_future() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn valid_bearer_is_user() {
        let uid = Uuid::new_v4();
        let header = format!("Bearer {}", token(uid, far_future(), SECRET));
        assert_eq!(resolve_identity(Some(&header), SECRET), Identity::User(uid));
    }

    #[test]
    fn bad_bearer_is_anonymous() {
        let wrong_key = format!("Bearer {}", token(Uuid::new_v4(), far_future(), "other"));
        assert_eq!(resolve_identity(Some(&wrong_key), SECRET), Identity::Anonymous);

        let expired = format!("Bearer {}", token(Uuid::new_v4(), 1_000, SECRET));
        assert_eq!(resolve_identity(Some(&expired), SECRET), Identity::Anonymous);

        assert_eq!(resolve_identity(Some("Bearer garbage"), SECRET), Identity::Anonymous);
    }

    #[test]
    fn guest_header_is_guest() {
        assert_eq!(
            resolve_identity(Some("Guest device-42"), SECRET),
            Identity::Guest("device-42".into())
        );
        assert_eq!(resolve_identity(Some("Guest   "), SECRET), Identity::Anonymous);
        assert_eq!(resolve_identity(Some("Basic abc"), SECRET), Identity::Anonymous);
        assert_eq!(resolve_identity(None, SECRET), Identity::Anonymous);
    }
}
