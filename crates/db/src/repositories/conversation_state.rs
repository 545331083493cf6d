use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use thunai_core::domain::conversation::{ConversationState, PendingQuestion};
use thunai_core::domain::user::UserId;
use thunai_core::store::{ConversationStateStore, StoreError};

use super::{decode_error, RepositoryError};
use crate::DbPool;

/// Conversation state persisted in sqlite so several processes can share it.
pub struct SqlConversationStateStore {
    pool: DbPool,
}

impl SqlConversationStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so that text comparison orders chronologically.
pub(crate) fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(decode_error)
}

fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationState, RepositoryError> {
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    let payload_json: String = row.try_get("payload_json").map_err(decode_error)?;
    let attempt_count: i64 = row.try_get("attempt_count").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    let pending: PendingQuestion = serde_json::from_str(&payload_json).map_err(decode_error)?;
    let attempt_count = u32::try_from(attempt_count).map_err(decode_error)?;

    Ok(ConversationState {
        user_id: UserId(user_id),
        pending,
        attempt_count,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

impl SqlConversationStateStore {
    async fn fetch(&self, user_id: &UserId) -> Result<Option<ConversationState>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, payload_json, attempt_count, created_at, updated_at
             FROM conversation_state WHERE user_id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_state(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, state: ConversationState) -> Result<(), RepositoryError> {
        let payload_json = serde_json::to_string(&state.pending).map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO conversation_state (user_id, awaiting, topic, payload_json,
                                             attempt_count, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 awaiting = excluded.awaiting,
                 topic = excluded.topic,
                 payload_json = excluded.payload_json,
                 attempt_count = excluded.attempt_count,
                 created_at = excluded.created_at,
                 updated_at = excluded.updated_at",
        )
        .bind(state.user_id.as_str())
        .bind(state.awaiting().as_str())
        .bind(state.pending.topic())
        .bind(payload_json)
        .bind(i64::from(state.attempt_count))
        .bind(timestamp(state.created_at))
        .bind(timestamp(state.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM conversation_state WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<UserId>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT user_id FROM conversation_state WHERE updated_at < ? ORDER BY user_id ASC",
        )
        .bind(timestamp(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("user_id").map(UserId).map_err(decode_error))
            .collect()
    }
}

#[async_trait::async_trait]
impl ConversationStateStore for SqlConversationStateStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.fetch(user_id).await?)
    }

    async fn put(&self, state: ConversationState) -> Result<(), StoreError> {
        Ok(self.upsert(state).await?)
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), StoreError> {
        Ok(self.delete(user_id).await?)
    }

    async fn stale_users(&self, cutoff: DateTime<Utc>) -> Result<Vec<UserId>, StoreError> {
        Ok(self.older_than(cutoff).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use thunai_core::domain::celebration::{CelebrationCandidate, CelebrationCategory};
    use thunai_core::domain::conversation::{Awaiting, ConversationState, PendingQuestion};
    use thunai_core::domain::user::UserId;
    use thunai_core::store::{ConversationStateStore, StoreError};

    use super::SqlConversationStateStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn celebration_state(user: &str, minutes_ago: i64) -> ConversationState {
        let candidate = CelebrationCandidate {
            person_name: "Priya".to_owned(),
            category: CelebrationCategory::Birthday,
            date: NaiveDate::from_ymd_opt(2026, 11, 15).expect("valid date"),
            source_text: "Priya's bday is nov 15th".to_owned(),
            confidence: 0.9,
        };
        ConversationState::new(
            UserId::new(user),
            PendingQuestion::CelebrationConfirmation { candidate },
            0,
            Utc::now() - Duration::minutes(minutes_ago),
        )
    }

    #[tokio::test]
    async fn put_and_get_round_trips_payload() {
        let store = SqlConversationStateStore::new(setup().await);
        let state = celebration_state("U1", 0);

        store.put(state.clone()).await.expect("put");
        let found = store.get(&UserId::new("U1")).await.expect("get").expect("exists");

        assert_eq!(found.awaiting(), Awaiting::CelebrationConfirmation);
        assert_eq!(found.pending, state.pending);
        assert_eq!(found.created_at.timestamp_micros(), state.created_at.timestamp_micros());
    }

    #[tokio::test]
    async fn put_overwrites_existing_state() {
        let store = SqlConversationStateStore::new(setup().await);
        let state = celebration_state("U1", 0);
        store.put(state.clone()).await.expect("put");

        let pending = state.pending.clone();
        store.put(state.advance(pending, 1, Utc::now())).await.expect("overwrite");

        let found = store.get(&UserId::new("U1")).await.expect("get").expect("exists");
        assert_eq!(found.attempt_count, 1);
    }

    #[tokio::test]
    async fn clear_and_stale_users() {
        let store = SqlConversationStateStore::new(setup().await);
        store.put(celebration_state("U-old", 90)).await.expect("put");
        store.put(celebration_state("U-new", 1)).await.expect("put");

        let stale =
            store.stale_users(Utc::now() - Duration::minutes(30)).await.expect("stale users");
        assert_eq!(stale, vec![UserId::new("U-old")]);

        store.clear(&UserId::new("U-old")).await.expect("clear");
        assert!(store.get(&UserId::new("U-old")).await.expect("get").is_none());
        assert!(store.get(&UserId::new("U-new")).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn corrupt_payload_is_reported() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO conversation_state (user_id, awaiting, topic, payload_json,
                                             attempt_count, created_at, updated_at)
             VALUES ('U1', 'schedule_response', 't', '{not json', 0,
                     '2026-10-16T10:00:00.000000Z', '2026-10-16T10:00:00.000000Z')",
        )
        .execute(&pool)
        .await
        .expect("insert raw row");

        let store = SqlConversationStateStore::new(pool);
        let error = store.get(&UserId::new("U1")).await.expect_err("decode should fail");
        assert!(matches!(error, StoreError::Corrupt(_)));
    }
}
