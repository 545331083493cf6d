use serde::{Deserialize, Serialize};

use crate::domain::attempt::{AttemptReason, AttemptType, CollectionAttempt};

/// Backoff rules for proactive collection prompts on a single topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPolicy {
    pub max_attempts: u32,
    pub stop_on_decline: bool,
    pub stop_on_complete: bool,
}

impl Default for CollectionPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, stop_on_decline: true, stop_on_complete: true }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    Declined,
    MaxAttempts,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Declined => "declined",
            Self::MaxAttempts => "max_attempts",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionDecision {
    /// Ask again; `attempt_number` is 1-based.
    Ask { attempt_number: u32 },
    Stop { reason: StopReason },
}

impl CollectionDecision {
    pub fn should_ask(&self) -> bool {
        matches!(self, Self::Ask { .. })
    }
}

impl CollectionPolicy {
    /// Decide whether to ask again given every ledger entry for one user and topic.
    pub fn evaluate(&self, attempts: &[CollectionAttempt]) -> CollectionDecision {
        if self.stop_on_complete && attempts.iter().any(|attempt| attempt.succeeded) {
            return CollectionDecision::Stop { reason: StopReason::Completed };
        }

        if self.stop_on_decline
            && attempts.iter().any(|attempt| attempt.reason == Some(AttemptReason::Declined))
        {
            return CollectionDecision::Stop { reason: StopReason::Declined };
        }

        let asked = attempts
            .iter()
            .filter(|attempt| attempt.attempt_type == AttemptType::Asked)
            .count() as u32;
        if asked >= self.max_attempts {
            return CollectionDecision::Stop { reason: StopReason::MaxAttempts };
        }

        CollectionDecision::Ask { attempt_number: asked + 1 }
    }
}
