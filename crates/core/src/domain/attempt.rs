use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptType {
    Asked,
    Clarification,
    Confirmation,
}

impl AttemptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asked => "asked",
            Self::Clarification => "clarification",
            Self::Confirmation => "confirmation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asked" => Some(Self::Asked),
            "clarification" => Some(Self::Clarification),
            "confirmation" => Some(Self::Confirmation),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptReason {
    Committed,
    Declined,
    MaxAttempts,
    BackendFailure,
    Expired,
}

impl AttemptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Declined => "declined",
            Self::MaxAttempts => "max_attempts",
            Self::BackendFailure => "backend_failure",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "committed" => Some(Self::Committed),
            "declined" => Some(Self::Declined),
            "max_attempts" => Some(Self::MaxAttempts),
            "backend_failure" => Some(Self::BackendFailure),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// One entry of the append-only collection ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionAttempt {
    pub user_id: UserId,
    pub topic: String,
    pub attempt_type: AttemptType,
    pub succeeded: bool,
    pub reason: Option<AttemptReason>,
    pub timestamp: DateTime<Utc>,
}

impl CollectionAttempt {
    pub fn asked(user_id: UserId, topic: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id,
            topic: topic.into(),
            attempt_type: AttemptType::Asked,
            succeeded: false,
            reason: None,
            timestamp,
        }
    }

    pub fn outcome(
        user_id: UserId,
        topic: impl Into<String>,
        attempt_type: AttemptType,
        reason: AttemptReason,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            topic: topic.into(),
            attempt_type,
            succeeded: reason == AttemptReason::Committed,
            reason: Some(reason),
            timestamp,
        }
    }
}
