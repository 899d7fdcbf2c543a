pub mod api;
pub mod models;

pub use models::{Challenge, ChallengeView, Choice, Identity, NewChallenge, Stats, Vote};
