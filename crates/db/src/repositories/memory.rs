use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use thunai_core::domain::attempt::CollectionAttempt;
use thunai_core::domain::conversation::ConversationState;
use thunai_core::domain::user::UserId;
use thunai_core::store::{CollectionLedger, ConversationStateStore, StoreError};

#[derive(Default)]
pub struct InMemoryConversationStateStore {
    states: RwLock<HashMap<UserId, ConversationState>>,
}

impl InMemoryConversationStateStore {
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ConversationStateStore for InMemoryConversationStateStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<ConversationState>, StoreError> {
        let states = self.states.read().await;
        Ok(states.get(user_id).cloned())
    }

    async fn put(&self, state: ConversationState) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        states.insert(state.user_id.clone(), state);
        Ok(())
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        states.remove(user_id);
        Ok(())
    }

    async fn stale_users(&self, cutoff: DateTime<Utc>) -> Result<Vec<UserId>, StoreError> {
        let states = self.states.read().await;
        let mut stale = states
            .values()
            .filter(|state| state.is_stale(cutoff))
            .map(|state| state.user_id.clone())
            .collect::<Vec<_>>();
        stale.sort();
        Ok(stale)
    }
}

#[derive(Default)]
pub struct InMemoryCollectionLedger {
    attempts: RwLock<Vec<CollectionAttempt>>,
}

impl InMemoryCollectionLedger {
    pub async fn all(&self) -> Vec<CollectionAttempt> {
        self.attempts.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CollectionLedger for InMemoryCollectionLedger {
    async fn append(&self, attempt: CollectionAttempt) -> Result<(), StoreError> {
        let mut attempts = self.attempts.write().await;
        attempts.push(attempt);
        Ok(())
    }

    async fn attempts_for(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Vec<CollectionAttempt>, StoreError> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .iter()
            .filter(|attempt| &attempt.user_id == user_id && attempt.topic == topic)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use thunai_core::domain::attempt::{AttemptReason, AttemptType, CollectionAttempt};
    use thunai_core::domain::conversation::{ConversationState, PendingQuestion};
    use thunai_core::domain::schedule::{ScheduleQuestion, TargetPeriod};
    use thunai_core::domain::user::UserId;
    use thunai_core::store::{CollectionLedger, ConversationStateStore};

    use super::{InMemoryCollectionLedger, InMemoryConversationStateStore};

    fn state(user: &str, updated_minutes_ago: i64) -> ConversationState {
        let question = ScheduleQuestion {
            target_period: TargetPeriod::Week {
                start: NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date"),
            },
            prompt: "Which days will you be in?".to_owned(),
        };
        ConversationState::new(
            UserId::new(user),
            PendingQuestion::ScheduleResponse { question },
            1,
            Utc::now() - Duration::minutes(updated_minutes_ago),
        )
    }

    #[tokio::test]
    async fn put_overwrites_and_clear_removes() {
        let store = InMemoryConversationStateStore::default();
        let user = UserId::new("U1");

        let first = state("U1", 5);
        store.put(first.clone()).await.expect("put");
        let pending = first.pending.clone();
        store.put(first.advance(pending, 2, Utc::now())).await.expect("overwrite");

        let found = store.get(&user).await.expect("get").expect("state exists");
        assert_eq!(found.attempt_count, 2);
        assert_eq!(store.len().await, 1);

        store.clear(&user).await.expect("clear");
        assert!(store.get(&user).await.expect("get").is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = InMemoryConversationStateStore::default();
        store.put(state("U1", 0)).await.expect("put U1");
        store.put(state("U2", 0)).await.expect("put U2");

        store.clear(&UserId::new("U1")).await.expect("clear U1");

        assert!(store.get(&UserId::new("U1")).await.expect("get").is_none());
        assert!(store.get(&UserId::new("U2")).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn stale_users_uses_cutoff() {
        let store = InMemoryConversationStateStore::default();
        store.put(state("U-old", 45)).await.expect("put");
        store.put(state("U-new", 1)).await.expect("put");

        let stale =
            store.stale_users(Utc::now() - Duration::minutes(30)).await.expect("stale users");
        assert_eq!(stale, vec![UserId::new("U-old")]);
    }

    #[tokio::test]
    async fn ledger_filters_by_user_and_topic() {
        let ledger = InMemoryCollectionLedger::default();
        let topic = "schedule:weekly:2026-10-19";
        ledger
            .append(CollectionAttempt::asked(UserId::new("U1"), topic, Utc::now()))
            .await
            .expect("append");
        ledger
            .append(CollectionAttempt::outcome(
                UserId::new("U1"),
                topic,
                AttemptType::Confirmation,
                AttemptReason::Committed,
                Utc::now(),
            ))
            .await
            .expect("append");
        ledger
            .append(CollectionAttempt::asked(UserId::new("U2"), topic, Utc::now()))
            .await
            .expect("append");

        let attempts = ledger.attempts_for(&UserId::new("U1"), topic).await.expect("attempts");
        assert_eq!(attempts.len(), 2);
        assert!(attempts[1].succeeded);
        assert_eq!(ledger.all().await.len(), 3);
    }
}
