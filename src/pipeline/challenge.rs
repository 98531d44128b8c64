//! Challenge sourcing.

use async_trait::async_trait;
use thiserror::Error;

use crate::attestation::{Challenge, ContentHash};

/// Reasons a challenge could not be issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("configured challenge is empty")]
    Empty,

    #[error("challenge source unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the challenge a signing session is bound to.
#[async_trait]
pub trait ChallengeSource: Send + Sync {
    /// Issue a challenge for the attestation of `content_hash`.
    async fn issue(&self, content_hash: &ContentHash) -> Result<Challenge, ChallengeError>;
}

/// Hands out the same configured challenge every time.
#[derive(Debug, Clone)]
pub struct StaticChallenge(Challenge);

impl StaticChallenge {
    pub fn new(challenge: impl Into<Challenge>) -> Self {
        Self(challenge.into())
    }
}

#[async_trait]
impl ChallengeSource for StaticChallenge {
    async fn issue(&self, _content_hash: &ContentHash) -> Result<Challenge, ChallengeError> {
        if self.0.is_empty() {
            return Err(ChallengeError::Empty);
        }
        Ok(self.0.clone())
    }
}
