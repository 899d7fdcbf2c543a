use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("invalid choice, must be A or B")]
    InvalidChoice,

    #[error("authentication required, sign up or use guest mode")]
    AuthenticationRequired,

    #[error("daily free limit reached, sign up for unlimited votes")]
    GuestLimitExceeded,

    #[error("already voted on this challenge")]
    AlreadyVoted,

    #[error("challenge not found")]
    ChallengeNotFound,

    #[error("no challenges available")]
    NoChallengesAvailable,

    #[error("storage failure: {0}")]
    StorageFailure(#[from] anyhow::Error),
}

impl ChallengeError {
    /// Stable identifier for clients; never changes with the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidChoice => "invalid_choice",
            Self::AuthenticationRequired => "authentication_required",
            Self::GuestLimitExceeded => "guest_limit_exceeded",
            Self::AlreadyVoted => "already_voted",
            Self::ChallengeNotFound => "challenge_not_found",
            Self::NoChallengesAvailable => "no_challenges_available",
            Self::StorageFailure(_) => "storage_failure",
        }
    }
}
