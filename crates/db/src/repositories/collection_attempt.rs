use sqlx::Row;

use thunai_core::domain::attempt::{AttemptReason, AttemptType, CollectionAttempt};
use thunai_core::domain::user::UserId;
use thunai_core::store::{CollectionLedger, StoreError};

use super::conversation_state::{parse_timestamp, timestamp};
use super::{decode_error, RepositoryError};
use crate::DbPool;

pub struct SqlCollectionLedger {
    pool: DbPool,
}

impl SqlCollectionLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_attempt(row: &sqlx::sqlite::SqliteRow) -> Result<CollectionAttempt, RepositoryError> {
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    let topic: String = row.try_get("topic").map_err(decode_error)?;
    let attempt_type: String = row.try_get("attempt_type").map_err(decode_error)?;
    let succeeded: bool = row.try_get("succeeded").map_err(decode_error)?;
    let reason: Option<String> = row.try_get("reason").map_err(decode_error)?;
    let occurred_at: String = row.try_get("occurred_at").map_err(decode_error)?;

    let attempt_type = AttemptType::parse(&attempt_type).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown attempt_type `{attempt_type}`"))
    })?;
    let reason = match reason {
        Some(value) => Some(
            AttemptReason::parse(&value)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown reason `{value}`")))?,
        ),
        None => None,
    };

    Ok(CollectionAttempt {
        user_id: UserId(user_id),
        topic,
        attempt_type,
        succeeded,
        reason,
        timestamp: parse_timestamp(&occurred_at)?,
    })
}

impl SqlCollectionLedger {
    async fn insert(&self, attempt: CollectionAttempt) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO collection_attempt (user_id, topic, attempt_type, succeeded, reason, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(attempt.user_id.as_str())
        .bind(&attempt.topic)
        .bind(attempt.attempt_type.as_str())
        .bind(attempt.succeeded)
        .bind(attempt.reason.map(|reason| reason.as_str()))
        .bind(timestamp(attempt.timestamp))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Vec<CollectionAttempt>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT user_id, topic, attempt_type, succeeded, reason, occurred_at
             FROM collection_attempt
             WHERE user_id = ? AND topic = ?
             ORDER BY id ASC",
        )
        .bind(user_id.as_str())
        .bind(topic)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_attempt).collect::<Result<Vec<_>, _>>()
    }
}

#[async_trait::async_trait]
impl CollectionLedger for SqlCollectionLedger {
    async fn append(&self, attempt: CollectionAttempt) -> Result<(), StoreError> {
        Ok(self.insert(attempt).await?)
    }

    async fn attempts_for(
        &self,
        user_id: &UserId,
        topic: &str,
    ) -> Result<Vec<CollectionAttempt>, StoreError> {
        Ok(self.select(user_id, topic).await?)
    }
}
