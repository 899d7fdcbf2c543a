use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use wouldyou_core::ChallengeError;
use wouldyou_types::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error("{0}")]
    BadRequest(String),

    #[error("no vote on this challenge")]
    VoteNotFound,

    #[error("request timed out")]
    Timeout,

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Challenge(e) => match e {
                ChallengeError::InvalidChoice => StatusCode::BAD_REQUEST,
                ChallengeError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
                ChallengeError::GuestLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
                ChallengeError::AlreadyVoted => StatusCode::CONFLICT,
                ChallengeError::ChallengeNotFound => StatusCode::NOT_FOUND,
                ChallengeError::NoChallengesAvailable => StatusCode::NOT_FOUND,
                ChallengeError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::VoteNotFound => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Challenge(e) => e.kind(),
            Self::BadRequest(_) => "bad_request",
            Self::VoteNotFound => "vote_not_found",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }

    /// Client-facing text. Store errors never leak their details.
    fn message(&self) -> String {
        match self {
            Self::Challenge(ChallengeError::StorageFailure(_)) | Self::Internal => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Challenge(ChallengeError::StorageFailure(e)) = &self {
            error!("Storage failure: {:#}", e);
        }

        let body = ErrorBody {
            error: true,
            kind: self.kind().to_string(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_details_are_hidden() {
        let err = ApiError::from(ChallengeError::StorageFailure(anyhow::anyhow!("disk I/O error at /var/db")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "storage_failure");
        assert_eq!(err.message(), "internal server error");
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (ChallengeError::InvalidChoice, StatusCode::BAD_REQUEST),
            (ChallengeError::AuthenticationRequired, StatusCode::UNAUTHORIZED),
            (ChallengeError::GuestLimitExceeded, StatusCode::TOO_MANY_REQUESTS),
            (ChallengeError::AlreadyVoted, StatusCode::CONFLICT),
            (ChallengeError::ChallengeNotFound, StatusCode::NOT_FOUND),
            (ChallengeError::NoChallengesAvailable, StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            let kind = err.kind();
            let api = ApiError::from(err);
            assert_eq!(api.status(), status, "{}", kind);
            assert_eq!(api.kind(), kind);
        }
        assert_eq!(ApiError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
