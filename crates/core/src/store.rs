use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::attempt::CollectionAttempt;
use crate::domain::conversation::ConversationState;
use crate::domain::user::UserId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),
    #[error("stored state could not be decoded: {0}")]
    Corrupt(String),
}

/// Keyed store holding at most one outstanding conversation state per user.
#[async_trait]
pub trait ConversationStateStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Option<ConversationState>, StoreError>;
    /// Replaces any existing state for the same user.
    async fn put(&self, state: ConversationState) -> Result<(), StoreError>;
    async fn clear(&self, user_id: &UserId) -> Result<(), StoreError>;
    /// Users whose state was last touched before `cutoff`.
    async fn stale_users(&self, cutoff: DateTime<Utc>) -> Result<Vec<UserId>, StoreError>;
}

/// Append-only record of collection prompts and their outcomes.
#[async_trait]
pub trait CollectionLedger: Send + Sync {
    async fn append(&self, attempt: CollectionAttempt) -> Result<(), StoreError>;
    async fn attempts_for(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Vec<CollectionAttempt>, StoreError>;
}
