//! Challenge selection, voting, streaks and guest limits for the
//! would-you-rather game. All state lives in [`wouldyou_db::Database`];
//! the service itself holds no per-request data.

pub mod clock;
pub mod error;
pub mod generator;
pub mod pool;
pub mod rotation;
pub mod service;
pub mod streak;

mod convert;
mod guest_limit;
mod queries;
mod voting;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ChallengeError;
pub use generator::{GlmConfig, GlmGenerator, NoGenerator, QuestionGenerator};
pub use service::{ChallengeService, ChallengeSettings};
